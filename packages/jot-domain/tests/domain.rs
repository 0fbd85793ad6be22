use jot_domain::{
	Error, ItemId, MarkupLanguage, Note, NoteDraft, NoteSummary, Notebook, NotebookDraft,
	SearchResultItem, parse_tags,
};

const NOTE_ID: &str = "0123456789abcdef0123456789abcdef";
const ROOT_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const ROOT_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
const CHILD_A1: &str = "a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1a1";
const GRANDCHILD: &str = "a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2a2";
const CYCLE_X: &str = "cccccccccccccccccccccccccccccccc";
const CYCLE_Y: &str = "dddddddddddddddddddddddddddddddd";

fn draft_note() -> NoteDraft {
	NoteDraft {
		id: NOTE_ID.to_string(),
		title: "Project Plan".to_string(),
		body: Some("Milestones.".to_string()),
		parent_id: ROOT_A.to_string(),
		created_time: 1_700_000_000_000,
		updated_time: 1_700_000_100_000,
		is_conflict: false,
		markup_language: Some(1),
		tags: vec![" work ".to_string(), String::new(), "plan".to_string()],
	}
}

fn notebook(id: &str, parent: Option<&str>, title: &str) -> Notebook {
	Notebook::new(NotebookDraft {
		id: id.to_string(),
		title: title.to_string(),
		parent_id: parent.map(str::to_string),
		created_time: 1,
		updated_time: 1,
	})
	.expect("Fixture notebook must be valid.")
}

#[test]
fn note_trims_tags_and_maps_markup() {
	let mut draft = draft_note();

	draft.markup_language = Some(2);

	let note = Note::new(draft).expect("Note must be valid.");

	assert_eq!(note.tags, vec!["work".to_string(), "plan".to_string()]);
	assert_eq!(note.markup_language, MarkupLanguage::Html);
}

#[test]
fn note_rejects_non_positive_timestamps() {
	let mut draft = draft_note();

	draft.created_time = 0;

	let err = Note::new(draft).expect_err("Expected timestamp validation error.");

	assert!(matches!(err, Error::Validation { field: "created_time", .. }));
}

#[test]
fn note_rejects_invalid_parent() {
	let mut draft = draft_note();

	draft.parent_id = String::new();

	assert!(Note::new(draft).is_err());
}

#[test]
fn note_without_body_omits_body_field() {
	let mut draft = draft_note();

	draft.body = None;

	let note = Note::new(draft).expect("Note must be valid.");
	let value = serde_json::to_value(&note).expect("Note must serialize.");

	assert!(value.get("body").is_none());
	assert_eq!(value["id"], NOTE_ID);
	assert_eq!(value["markup_language"], "markdown");
}

#[test]
fn summary_copies_listing_fields() {
	let note = Note::new(draft_note()).expect("Note must be valid.");
	let summary = note.summary();
	let expected = NoteSummary::new(
		NOTE_ID,
		"Project Plan".to_string(),
		ROOT_A,
		1_700_000_000_000,
		1_700_000_100_000,
	)
	.expect("Summary must be valid.");

	assert_eq!(summary, expected);
}

#[test]
fn tag_strings_split_on_commas() {
	assert_eq!(parse_tags("a, b ,,c"), vec!["a", "b", "c"]);
	assert!(parse_tags("  ").is_empty());
}

#[test]
fn notebook_title_is_required() {
	let err = Notebook::new(NotebookDraft {
		id: ROOT_A.to_string(),
		title: "   ".to_string(),
		parent_id: None,
		created_time: 1,
		updated_time: 1,
	})
	.expect_err("Expected title validation error.");

	assert!(matches!(err, Error::Validation { field: "title", .. }));
}

#[test]
fn empty_parent_means_root() {
	let nb = notebook(ROOT_A, Some(""), "Work");

	assert_eq!(nb.parent_id, None);
}

#[test]
fn tree_nests_children_in_input_order() {
	let flat = vec![
		notebook(GRANDCHILD, Some(CHILD_A1), "Grandchild"),
		notebook(ROOT_A, None, "Work"),
		notebook(CHILD_A1, Some(ROOT_A), "Child"),
		notebook(ROOT_B, None, "Personal"),
	];
	let tree = Notebook::build_tree(flat, None);

	assert_eq!(tree.len(), 2);
	assert_eq!(tree[0].title, "Work");
	assert_eq!(tree[1].title, "Personal");
	assert_eq!(tree[0].children[0].title, "Child");
	assert_eq!(tree[0].children[0].children[0].title, "Grandchild");
	assert_eq!(tree[0].total_count(), 3);
}

#[test]
fn tree_can_start_below_the_root() {
	let root = ItemId::parse("parent_id", ROOT_A).expect("valid id");
	let flat = vec![
		notebook(ROOT_A, None, "Work"),
		notebook(CHILD_A1, Some(ROOT_A), "Child"),
		notebook(GRANDCHILD, Some(CHILD_A1), "Grandchild"),
	];
	let tree = Notebook::build_tree(flat, Some(&root));

	assert_eq!(tree.len(), 1);
	assert_eq!(tree[0].title, "Child");
	assert_eq!(tree[0].children.len(), 1);
}

#[test]
fn tree_ignores_cycles_and_self_parents() {
	let flat = vec![
		notebook(ROOT_A, None, "Work"),
		notebook(CYCLE_X, Some(CYCLE_Y), "X"),
		notebook(CYCLE_Y, Some(CYCLE_X), "Y"),
		notebook(ROOT_B, Some(ROOT_B), "Self"),
	];
	let tree = Notebook::build_tree(flat, None);

	assert_eq!(tree.len(), 1);
	assert_eq!(tree[0].title, "Work");
	assert!(tree[0].children.is_empty());
}

#[test]
fn result_item_score_must_be_in_unit_range() {
	assert!(SearchResultItem::new(NOTE_ID, "t".into(), "s".into(), 0.1).is_ok());
	assert!(SearchResultItem::new(NOTE_ID, "t".into(), "s".into(), 1.0).is_ok());
	assert!(SearchResultItem::new(NOTE_ID, "t".into(), "s".into(), 1.5).is_err());
	assert!(SearchResultItem::new(NOTE_ID, "t".into(), "s".into(), f32::NAN).is_err());
}

#[test]
fn result_item_lowercases_note_id() {
	let item = SearchResultItem::new(&NOTE_ID.to_uppercase(), "t".into(), "s".into(), 0.5)
		.expect("Item must be valid.");

	assert_eq!(item.note_id.as_str(), NOTE_ID);
}
