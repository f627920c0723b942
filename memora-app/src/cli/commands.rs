use crate::cli::cards::{load_cards, read_csv, save_cards, write_csv};
use crate::cli::opts::*;

use anyhow::{bail, Context, Result};
use memora_core::{
    autofill_card, autofill_existing, bulk_apply, load_draft, Autofill, BulkError, FileStore,
    LessonDraft, LessonGateway, LessonSaver, LessonWrite, MemoryBackend, SaveTarget, UploadPolicy,
    Uploader,
};
use memora_http::{ApiClient, TokenStore};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// The three backend seams, pointed either at the REST API or at an in-memory stand-in.
pub struct Backend {
    pub files: Arc<dyn FileStore>,
    pub autofill: Arc<dyn Autofill>,
    pub lessons: Arc<dyn LessonGateway>,
    memory: Option<Arc<MemoryBackend>>,
}

impl Backend {
    pub async fn open(args: &Cli) -> Result<Self> {
        if args.offline {
            let mem = Arc::new(MemoryBackend::new());
            return Ok(Self {
                files: mem.clone(),
                autofill: mem.clone(),
                lessons: mem.clone(),
                memory: Some(mem),
            });
        }
        let token = match &args.token {
            Some(t) => Some(t.clone()),
            None => TokenStore::open_default().load().await?,
        };
        if token.is_none() {
            warn!("no bearer token; run `memora login --token ...` if the backend rejects requests");
        }
        let api = Arc::new(ApiClient::new(args.api_url.clone(), token)?);
        info!(base = %api.base_url(), "using REST backend");
        Ok(Self {
            files: api.clone(),
            autofill: api.clone(),
            lessons: api,
            memory: None,
        })
    }
}

pub async fn run_cli(args: Cli) -> Result<()> {
    match args.cmd.clone() {
        Command::Login { token } => {
            let store = TokenStore::open_default();
            store.save(&token).await?;
            println!("token saved to {}", store.path().display());
        }
        Command::Logout => {
            if TokenStore::open_default().clear().await? {
                println!("logged out");
            } else {
                println!("no stored token");
            }
        }
        Command::Upload(c) => upload_cmd(&Backend::open(&args).await?, c).await?,
        Command::Autofill { words } => autofill_cmd(&Backend::open(&args).await?, words).await?,
        Command::Cards(c) => cards_cmd(&Backend::open(&args).await?, c).await?,
        Command::Lesson(c) => lesson_cmd(&Backend::open(&args).await?, c).await?,
    }
    Ok(())
}

async fn upload_cmd(backend: &Backend, cmd: UploadCmd) -> Result<()> {
    let uploader = Uploader::new(backend.files.clone(), UploadPolicy::images(cmd.prefix));
    let res = uploader.upload_path(&cmd.path).await?;
    println!("{}", res.public_url);
    Ok(())
}

async fn autofill_cmd(backend: &Backend, words: Vec<String>) -> Result<()> {
    let words: Vec<String> = words
        .iter()
        .flat_map(|w| memora_core::parse_words(w))
        .collect();
    if words.is_empty() {
        bail!("no words given");
    }
    let records = backend.autofill.autofill(&words).await?;
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}

async fn cards_cmd(backend: &Backend, cmd: CardsCmd) -> Result<()> {
    match cmd {
        CardsCmd::Merge(m) => {
            let mut cards = load_cards(&m.cards)?;
            let out = m.out.clone().unwrap_or_else(|| m.cards.clone());
            let res = bulk_apply(&mut cards, &m.words, m.mode.into(), &*backend.autofill).await;
            // Seeded cards are kept even when enrichment fails, so write before reporting.
            match res {
                Ok(o) => {
                    save_cards(&out, &cards)?;
                    println!(
                        "{} card(s) now; {} new, {} filled",
                        cards.len(),
                        o.added.len(),
                        o.matched
                    );
                }
                Err(e @ BulkError::EnrichmentFailed(_)) => {
                    save_cards(&out, &cards)?;
                    bail!("{e}; words were added, run `memora cards fill` to retry");
                }
                Err(e) => return Err(e.into()),
            }
        }
        CardsCmd::Fill { cards: path, index } => {
            let mut cards = load_cards(&path)?;
            let filled = match index {
                Some(i) => autofill_card(&mut cards, i, &*backend.autofill).await?,
                None => autofill_existing(&mut cards, &*backend.autofill).await?,
            };
            save_cards(&path, &cards)?;
            println!("{filled} filled");
        }
        CardsCmd::ImportCsv { csv, out } => {
            let f = std::fs::File::open(&csv).with_context(|| format!("opening {}", csv.display()))?;
            let cards = read_csv(f)?;
            save_cards(&out, &cards)?;
            println!("imported {} card(s)", cards.len());
        }
        CardsCmd::ExportCsv { cards, csv } => {
            let list = load_cards(&cards)?;
            let f = std::fs::File::create(&csv).with_context(|| format!("creating {}", csv.display()))?;
            write_csv(f, &list)?;
            println!("wrote {}", csv.display());
        }
    }
    Ok(())
}

async fn lesson_cmd(backend: &Backend, cmd: LessonCmd) -> Result<()> {
    match cmd {
        LessonCmd::Show { id } => {
            let lesson = backend.lessons.get_lesson(id).await?;
            let chapter = match backend.lessons.get_chapter(lesson.chapter_id).await {
                Ok(c) => c.label(),
                Err(e) => {
                    warn!(error = %e, "chapter lookup failed");
                    lesson.chapter_id.to_string()
                }
            };
            println!("{}\t{}\t{:?}\tchapter={}\torder={}", lesson.id, lesson.title, lesson.kind, chapter, lesson.order);
        }
        LessonCmd::Pull { id, out } => {
            let (_, draft) = load_draft(&*backend.lessons, id).await?;
            write_draft(&out, &draft)?;
            println!("wrote {} ({} card(s))", out.display(), draft.cards().len());
        }
        LessonCmd::Push(p) => push_cmd(backend, p).await?,
    }
    Ok(())
}

async fn push_cmd(backend: &Backend, cmd: PushCmd) -> Result<()> {
    let draft = read_draft(&cmd.draft)?;
    let target = match (cmd.chapter, cmd.lesson) {
        (Some(chapter_id), None) => SaveTarget::Create { chapter_id },
        (None, Some(lesson_id)) => {
            let lesson = backend
                .lessons
                .get_lesson(lesson_id)
                .await
                .with_context(|| format!("loading lesson {lesson_id}"))?;
            SaveTarget::for_lesson(&lesson)
        }
        _ => bail!("pass exactly one of --chapter or --lesson"),
    };

    let saver = LessonSaver::new(backend.files.clone(), backend.lessons.clone());
    let saved = saver.save(&draft, &target).await?;

    if let Some(mem) = &backend.memory {
        for w in mem.writes() {
            let payload = match w {
                LessonWrite::Create(p) | LessonWrite::Update(_, p) => p,
            };
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        return Ok(());
    }
    match saved.id {
        Some(id) => println!("saved lesson {id}"),
        None => println!("saved"),
    }
    Ok(())
}

fn read_draft(path: &Path) -> Result<LessonDraft> {
    let data = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn write_draft(path: &Path, draft: &LessonDraft) -> Result<()> {
    let s = serde_json::to_string_pretty(draft)?;
    std::fs::write(path, s).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use memora_core::CardDraft;

    fn offline(args: &[&str]) -> Cli {
        let mut argv = vec!["memora", "--offline"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn offline_merge_writes_the_card_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cards.json");
        let p = path.to_str().unwrap();

        run_cli(offline(&["cards", "merge", "--cards", p, "--words", "chó mèo"])).await.unwrap();

        let cards = load_cards(&path).unwrap();
        let words: Vec<&str> = cards.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(words, ["chó", "mèo"]);
    }

    #[tokio::test]
    async fn offline_push_creates_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lesson.json");
        write_draft(&path, &LessonDraft::study_set("Animals", vec![CardDraft::blank("dog")])).unwrap();

        run_cli(offline(&["lesson", "push", "--draft", path.to_str().unwrap(), "--chapter", "3"]))
            .await
            .unwrap();
    }
}
