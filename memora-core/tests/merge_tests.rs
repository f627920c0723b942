use memora_core::{merge_cards, CardDraft, Enrichment, MergeMode};

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|w| w.to_string()).collect()
}

#[test]
fn add_mode_appends_and_fills_new_word() {
    let existing = vec![CardDraft::blank("dog").with_meaning("a pet")];
    let recs = vec![Enrichment::new("cat").meaning("a pet too")];

    let out = merge_cards(&existing, &words(&["cat"]), MergeMode::Add, &recs);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].word, "dog");
    assert_eq!(out[0].meaning, "a pet");
    assert_eq!(out[1].word, "cat");
    assert_eq!(out[1].meaning, "a pet too");
}

#[test]
fn override_without_match_leaves_blank_card() {
    let existing = vec![
        CardDraft::blank("dog").with_meaning("a pet"),
        CardDraft::blank("cat").with_meaning("another pet"),
    ];

    let out = merge_cards(&existing, &words(&["fish"]), MergeMode::Override, &[]);

    assert_eq!(out.len(), 1);
    assert!(out[0].same_content(&CardDraft::blank("fish")));
}

#[test]
fn add_mode_never_touches_existing_cards() {
    let mut dog = CardDraft::blank("dog").with_meaning("a pet");
    dog.example = "the dog barks".into();
    let blank_cat = CardDraft::blank("cat");
    let existing = vec![dog, blank_cat];
    // Records for words that are already in the list must not leak into the old range.
    let mut rich = Enrichment::new("cat").meaning("feline");
    rich.example = Some("the cat sleeps".into());
    let recs = vec![Enrichment::new("dog").meaning("canine"), rich];

    let out = merge_cards(&existing, &words(&["cat", "bird", "dog"]), MergeMode::Add, &recs);

    assert_eq!(out.len(), existing.len() + 3);
    for (before, after) in existing.iter().zip(&out) {
        assert!(before.same_content(after));
        assert_eq!(before.key, after.key);
    }
    assert_eq!(out[2].meaning, "feline");
    assert_eq!(out[2].example, "the cat sleeps");
    assert_eq!(out[3].meaning, "");
    assert_eq!(out[4].meaning, "canine");
}

#[test]
fn override_fields_come_from_record_or_stay_empty() {
    let existing = vec![CardDraft::blank("old").with_meaning("gone")];
    let mut rec = Enrichment::new("tree");
    rec.meaning = Some("cây".into());
    rec.pronunciation = Some("triː".into());
    rec.kind = Some("noun".into());
    rec.meaning_description = Some("  ".into());

    let out = merge_cards(&existing, &words(&["tree", "rock"]), MergeMode::Override, &[rec]);

    assert_eq!(out.len(), 2);
    assert_eq!(out[0].meaning, "cây");
    assert_eq!(out[0].pronounce, "triː");
    assert_eq!(out[0].kind, "noun");
    assert_eq!(out[0].meaning_description, "");
    assert!(out[1].same_content(&CardDraft::blank("rock")));
}

#[test]
fn duplicate_words_each_get_the_record() {
    let recs = vec![Enrichment::new("sun").meaning("mặt trời")];
    let out = merge_cards(&[], &words(&["sun", "sun"]), MergeMode::Add, &recs);
    assert_eq!(out.len(), 2);
    assert!(out.iter().all(|c| c.meaning == "mặt trời"));
    assert_ne!(out[0].key, out[1].key);
}

#[test]
fn response_order_does_not_matter() {
    let recs = vec![
        Enrichment::new("b").meaning("B"),
        Enrichment::new("a").meaning("A"),
    ];
    let out = merge_cards(&[], &words(&["a", "b", "c"]), MergeMode::Override, &recs);
    let meanings: Vec<&str> = out.iter().map(|c| c.meaning.as_str()).collect();
    assert_eq!(meanings, vec!["A", "B", ""]);
}
