use anyhow::{Context, Result};
use memora_core::{CardDraft, CardImage};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const HEADER: [&str; 10] = [
    "word",
    "meaning",
    "pronounce",
    "ranking",
    "sino_vietnamese",
    "type",
    "meaning_description",
    "example",
    "example_meaning",
    "image",
];

pub fn load_cards(path: &Path) -> Result<Vec<CardDraft>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

pub fn save_cards(path: &Path, cards: &[CardDraft]) -> Result<()> {
    let s = serde_json::to_string_pretty(cards)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))
}

fn image_cell(image: &CardImage) -> String {
    match image {
        CardImage::None => String::new(),
        CardImage::Remote(url) => url.clone(),
        CardImage::Pending(p) => p.display().to_string(),
    }
}

/// URLs stay remote; anything else is a local file waiting for upload.
pub fn parse_image_cell(cell: &str) -> CardImage {
    let cell = cell.trim();
    if cell.is_empty() {
        CardImage::None
    } else if cell.starts_with("http://") || cell.starts_with("https://") {
        CardImage::Remote(cell.to_string())
    } else {
        CardImage::Pending(PathBuf::from(cell))
    }
}

pub fn write_csv<W: Write>(w: W, cards: &[CardDraft]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(HEADER)?;
    for c in cards {
        wtr.write_record([
            c.word.clone(),
            c.meaning.clone(),
            c.pronounce.clone(),
            c.ranking.map(|r| r.to_string()).unwrap_or_default(),
            c.sino_vietnamese.clone(),
            c.kind.clone(),
            c.meaning_description.clone(),
            c.example.clone(),
            c.example_meaning.clone(),
            image_cell(&c.image),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_csv<R: Read>(r: R) -> Result<Vec<CardDraft>> {
    let mut rdr = csv::Reader::from_reader(r);
    let mut cards = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec?;
        let get = |n: usize| rec.get(n).unwrap_or("").to_string();
        let word = get(0).trim().to_string();
        if word.is_empty() {
            continue;
        }
        let ranking = match rec.get(3).map(str::trim).filter(|s| !s.is_empty()) {
            Some(s) => Some(s.parse::<i32>().with_context(|| format!("row {}: bad ranking {s:?}", i + 2))?),
            None => None,
        };
        let mut card = CardDraft::blank(word);
        card.meaning = get(1);
        card.pronounce = get(2);
        card.ranking = ranking;
        card.sino_vietnamese = get(4);
        card.kind = get(5);
        card.meaning_description = get(6);
        card.example = get(7);
        card.example_meaning = get(8);
        card.image = parse_image_cell(&get(9));
        cards.push(card);
    }
    Ok(cards)
}
