use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fmt::{Display, Formatter};

use crate::blocks::{BlockId, BlockKind, BlockType, Code, ContentBlock, Heading, HeadingLevel, List, Media, Note, NoteVariant, Paragraph};
use crate::media::UploadedMedia;

/// Languages offered by the code block language selector.
pub const CODE_LANGUAGES: &[&str] = &[
    "plaintext", "bash", "c", "cpp", "csharp", "css", "go", "html", "java", "javascript",
    "json", "kotlin", "python", "rust", "sql", "swift", "toml", "typescript", "yaml",
];

/// One field edit coming from a block editor form.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockEdit {
    /// Heading/paragraph/note text or code source.
    Text(String),
    Level(u8),
    Underline(bool),
    Title(String),
    Language(String),
    LineNumbers(bool),
    Url(String),
    Caption(String),
    Variant(NoteVariant),
    AddItem(String),
    EditItem(usize, String),
    RemoveItem(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    NotApplicable { edit: &'static str, block_type: String },
    InvalidLevel(u8),
    UnsupportedLanguage(String),
    ItemOutOfRange(usize),
    EmptyItem,
    UnknownField(String),
    InvalidValue { field: String, value: String },
}

impl Display for EditError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NotApplicable { edit, block_type } => write!(f, "Field '{}' does not apply to {} blocks", edit, block_type),
            EditError::InvalidLevel(level) => write!(f, "Heading level must be 2 or 3, got {}", level),
            EditError::UnsupportedLanguage(lang) => write!(f, "Language '{}' is not in the language list", lang),
            EditError::ItemOutOfRange(index) => write!(f, "List item {} does not exist", index),
            EditError::EmptyItem => write!(f, "List items cannot be empty"),
            EditError::UnknownField(field) => write!(f, "Unknown block field '{}'", field),
            EditError::InvalidValue { field, value } => write!(f, "Invalid value '{}' for field '{}'", value, field),
        }
    }
}

impl std::error::Error for EditError {}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim(), "on" | "true" | "1" | "yes")
}

impl BlockEdit {
    pub fn name(&self) -> &'static str {
        match self {
            BlockEdit::Text(_) => "text",
            BlockEdit::Level(_) => "level",
            BlockEdit::Underline(_) => "underline",
            BlockEdit::Title(_) => "title",
            BlockEdit::Language(_) => "language",
            BlockEdit::LineNumbers(_) => "line_numbers",
            BlockEdit::Url(_) => "url",
            BlockEdit::Caption(_) => "caption",
            BlockEdit::Variant(_) => "variant",
            BlockEdit::AddItem(_) => "add_item",
            BlockEdit::EditItem(_, _) => "item",
            BlockEdit::RemoveItem(_) => "remove_item",
        }
    }

    /// Decodes a form post. Checkboxes arrive as `on` or not at all.
    pub fn from_form(field: &str, value: &str) -> Result<BlockEdit, EditError> {
        let invalid = || EditError::InvalidValue { field: field.to_string(), value: value.to_string() };
        let edit = match field {
            "text" | "code" => BlockEdit::Text(value.to_string()),
            "level" => BlockEdit::Level(value.trim().parse().map_err(|_| invalid())?),
            "underline" => BlockEdit::Underline(parse_flag(value)),
            "title" => BlockEdit::Title(value.to_string()),
            "language" => BlockEdit::Language(value.trim().to_string()),
            "line_numbers" => BlockEdit::LineNumbers(parse_flag(value)),
            "url" => BlockEdit::Url(value.trim().to_string()),
            "caption" => BlockEdit::Caption(value.to_string()),
            "variant" => BlockEdit::Variant(value.trim().parse().map_err(|_| invalid())?),
            "add_item" => BlockEdit::AddItem(value.to_string()),
            "remove_item" => BlockEdit::RemoveItem(value.trim().parse().map_err(|_| invalid())?),
            f if f.starts_with("item_") => {
                let index = f["item_".len()..].parse().map_err(|_| invalid())?;
                BlockEdit::EditItem(index, value.to_string())
            }
            f => return Err(EditError::UnknownField(f.to_string())),
        };
        Ok(edit)
    }
}

fn not_applicable(edit: &BlockEdit, block_type: &str) -> EditError {
    EditError::NotApplicable {
        edit: edit.name(),
        block_type: block_type.to_string(),
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

/// Applies `edit` and returns the complete replacement block.
pub fn edit_block(block: &ContentBlock, edit: BlockEdit) -> Result<ContentBlock, EditError> {
    let kind = match &block.kind {
        BlockKind::Heading(heading) => BlockKind::Heading(edit_heading(heading, edit)?),
        BlockKind::Paragraph(_) => match edit {
            BlockEdit::Text(text) => BlockKind::Paragraph(Paragraph { text }),
            other => return Err(not_applicable(&other, "paragraph")),
        },
        BlockKind::Code(code) => BlockKind::Code(edit_code(code, edit)?),
        BlockKind::Image(media) => BlockKind::Image(edit_media(media, edit, "image")?),
        BlockKind::Video(media) => BlockKind::Video(edit_media(media, edit, "video")?),
        BlockKind::Note(note) => BlockKind::Note(edit_note(note, edit)?),
        BlockKind::List(list) => BlockKind::List(edit_list(list, edit)?),
        BlockKind::Separator => return Err(not_applicable(&edit, "separator")),
        BlockKind::Unknown(unknown) => return Err(not_applicable(&edit, &unknown.type_name)),
    };

    Ok(ContentBlock::new(block.id.clone(), kind))
}

/// Writes the url of a finished upload into an image or video block.
pub fn attach_upload(block: &ContentBlock, media: &UploadedMedia) -> Result<ContentBlock, EditError> {
    match block.block_type() {
        Some(BlockType::Image) | Some(BlockType::Video) => edit_block(block, BlockEdit::Url(media.url.clone())),
        _ => Err(EditError::NotApplicable {
            edit: "upload",
            block_type: block.type_name().to_string(),
        }),
    }
}

fn edit_heading(heading: &Heading, edit: BlockEdit) -> Result<Heading, EditError> {
    let mut next = heading.clone();
    match edit {
        BlockEdit::Text(text) => next.text = text,
        BlockEdit::Level(level) => {
            next.level = HeadingLevel::try_from(level).map_err(|_| EditError::InvalidLevel(level))?;
        }
        BlockEdit::Underline(underline) => next.underline = underline,
        other => return Err(not_applicable(&other, "heading")),
    }
    Ok(next)
}

fn edit_code(code: &Code, edit: BlockEdit) -> Result<Code, EditError> {
    let mut next = code.clone();
    match edit {
        BlockEdit::Text(source) => next.code = source,
        BlockEdit::Title(title) => next.title = non_empty(title),
        BlockEdit::Language(language) => {
            if !CODE_LANGUAGES.contains(&language.as_str()) {
                return Err(EditError::UnsupportedLanguage(language));
            }
            next.language = language;
        }
        BlockEdit::LineNumbers(show) => next.show_line_numbers = show,
        other => return Err(not_applicable(&other, "code")),
    }
    Ok(next)
}

fn edit_media(media: &Media, edit: BlockEdit, block_type: &str) -> Result<Media, EditError> {
    let mut next = media.clone();
    match edit {
        BlockEdit::Url(url) => next.url = url,
        BlockEdit::Caption(caption) => next.caption = non_empty(caption),
        other => return Err(not_applicable(&other, block_type)),
    }
    Ok(next)
}

fn edit_note(note: &Note, edit: BlockEdit) -> Result<Note, EditError> {
    let mut next = note.clone();
    match edit {
        BlockEdit::Text(text) => next.text = text,
        BlockEdit::Variant(variant) => next.variant = variant,
        other => return Err(not_applicable(&other, "note")),
    }
    Ok(next)
}

fn edit_list(list: &List, edit: BlockEdit) -> Result<List, EditError> {
    let mut next = list.clone();
    match edit {
        BlockEdit::AddItem(item) => {
            let item = item.trim();
            if item.is_empty() {
                return Err(EditError::EmptyItem);
            }
            next.items.push(item.to_string());
        }
        BlockEdit::EditItem(index, item) => {
            let slot = next.items.get_mut(index).ok_or(EditError::ItemOutOfRange(index))?;
            *slot = item;
        }
        BlockEdit::RemoveItem(index) => {
            if index >= next.items.len() {
                return Err(EditError::ItemOutOfRange(index));
            }
            next.items.remove(index);
        }
        other => return Err(not_applicable(&other, "list")),
    }
    Ok(next)
}

/// Editor-only state. Nothing in here is ever saved with the post.
#[derive(Debug, Default)]
pub struct EditorViewState {
    expanded: HashSet<BlockId>,
    pending_items: HashMap<BlockId, String>,
}

impl EditorViewState {
    pub fn can_expand(block: &ContentBlock) -> bool {
        matches!(block.kind, BlockKind::Paragraph(_) | BlockKind::Code(_) | BlockKind::Note(_))
    }

    /// Flips the expanded flag and returns the new value. Blocks without a tall
    /// editor stay collapsed.
    pub fn toggle_expanded(&mut self, block: &ContentBlock) -> bool {
        if !Self::can_expand(block) {
            return false;
        }
        if self.expanded.remove(&block.id) {
            false
        } else {
            self.expanded.insert(block.id.clone());
            true
        }
    }

    pub fn is_expanded(&self, id: &BlockId) -> bool {
        self.expanded.contains(id)
    }

    pub fn set_pending_item(&mut self, id: &BlockId, text: &str) {
        self.pending_items.insert(id.clone(), text.to_string());
    }

    pub fn pending_item(&self, id: &BlockId) -> &str {
        self.pending_items.get(id).map(|s| s.as_str()).unwrap_or_default()
    }

    /// Turns the pending item of a list block into a real item. Returns `None`
    /// when nothing was typed.
    pub fn submit_pending_item(&mut self, block: &ContentBlock) -> Result<Option<ContentBlock>, EditError> {
        let pending = self.pending_items.remove(&block.id).unwrap_or_default();
        if pending.trim().is_empty() {
            return Ok(None);
        }
        match edit_block(block, BlockEdit::AddItem(pending.clone())) {
            Ok(updated) => Ok(Some(updated)),
            Err(e) => {
                self.pending_items.insert(block.id.clone(), pending);
                Err(e)
            }
        }
    }

    pub fn forget(&mut self, id: &BlockId) {
        self.expanded.remove(id);
        self.pending_items.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Map;

    use crate::blocks::UnknownBlock;

    use super::*;

    fn block(kind: BlockKind) -> ContentBlock {
        ContentBlock::new(BlockId("42".to_string()), kind)
    }

    #[test]
    fn test_from_form() {
        assert_eq!(BlockEdit::from_form("level", "3"), Ok(BlockEdit::Level(3)));
        assert_eq!(BlockEdit::from_form("underline", "on"), Ok(BlockEdit::Underline(true)));
        assert_eq!(BlockEdit::from_form("underline", ""), Ok(BlockEdit::Underline(false)));
        assert_eq!(BlockEdit::from_form("variant", "tip"), Ok(BlockEdit::Variant(NoteVariant::Tip)));
        assert_eq!(BlockEdit::from_form("item_2", "third"), Ok(BlockEdit::EditItem(2, "third".to_string())));
        assert_eq!(BlockEdit::from_form("remove_item", "0"), Ok(BlockEdit::RemoveItem(0)));
        assert_eq!(BlockEdit::from_form("code", "let x = 1;"), Ok(BlockEdit::Text("let x = 1;".to_string())));
        assert!(matches!(BlockEdit::from_form("level", "two"), Err(EditError::InvalidValue { .. })));
        assert!(matches!(BlockEdit::from_form("variant", "danger"), Err(EditError::InvalidValue { .. })));
        assert_eq!(BlockEdit::from_form("colour", "red"), Err(EditError::UnknownField("colour".to_string())));
    }

    #[test]
    fn test_heading_edits() {
        let heading = block(BlockKind::Heading(Heading::default()));
        let heading = edit_block(&heading, BlockEdit::Text("Overview".to_string())).unwrap();
        let heading = edit_block(&heading, BlockEdit::Underline(true)).unwrap();
        let heading = edit_block(&heading, BlockEdit::Level(3)).unwrap();
        assert_eq!(heading.id, BlockId("42".to_string()));
        assert_eq!(heading.kind, BlockKind::Heading(Heading {
            text: "Overview".to_string(),
            level: HeadingLevel::H3,
            underline: true,
        }));
        assert_eq!(edit_block(&heading, BlockEdit::Level(4)), Err(EditError::InvalidLevel(4)));
        assert!(matches!(edit_block(&heading, BlockEdit::Url("x".to_string())), Err(EditError::NotApplicable { .. })));
    }

    #[test]
    fn test_code_edits() {
        let code = block(BlockKind::Code(Code::default()));
        let code = edit_block(&code, BlockEdit::Language("rust".to_string())).unwrap();
        let code = edit_block(&code, BlockEdit::Title("main.rs".to_string())).unwrap();
        let code = edit_block(&code, BlockEdit::LineNumbers(true)).unwrap();
        let code = edit_block(&code, BlockEdit::Text("fn main() {}".to_string())).unwrap();
        assert_eq!(code.kind, BlockKind::Code(Code {
            code: "fn main() {}".to_string(),
            title: Some("main.rs".to_string()),
            language: "rust".to_string(),
            show_line_numbers: true,
        }));

        let cleared = edit_block(&code, BlockEdit::Title("  ".to_string())).unwrap();
        assert!(matches!(cleared.kind, BlockKind::Code(Code { title: None, .. })));
        assert_eq!(
            edit_block(&code, BlockEdit::Language("cobol".to_string())),
            Err(EditError::UnsupportedLanguage("cobol".to_string()))
        );
    }

    #[test]
    fn test_list_edits() {
        let list = block(BlockKind::List(List::default()));
        let list = edit_block(&list, BlockEdit::AddItem("  one ".to_string())).unwrap();
        let list = edit_block(&list, BlockEdit::AddItem("two".to_string())).unwrap();
        let list = edit_block(&list, BlockEdit::EditItem(1, "deux".to_string())).unwrap();
        let list = edit_block(&list, BlockEdit::AddItem("three".to_string())).unwrap();
        let list = edit_block(&list, BlockEdit::RemoveItem(0)).unwrap();
        assert_eq!(list.kind, BlockKind::List(List { items: vec!["deux".to_string(), "three".to_string()] }));

        assert_eq!(edit_block(&list, BlockEdit::AddItem(" ".to_string())), Err(EditError::EmptyItem));
        assert_eq!(edit_block(&list, BlockEdit::RemoveItem(2)), Err(EditError::ItemOutOfRange(2)));
        assert_eq!(edit_block(&list, BlockEdit::EditItem(9, "x".to_string())), Err(EditError::ItemOutOfRange(9)));
    }

    #[test]
    fn test_separator_and_unknown_reject_edits() {
        let separator = block(BlockKind::Separator);
        assert!(edit_block(&separator, BlockEdit::Text("x".to_string())).is_err());

        let quote = block(BlockKind::Unknown(UnknownBlock { type_name: "quote".to_string(), fields: Map::new() }));
        assert_eq!(edit_block(&quote, BlockEdit::Text("x".to_string())), Err(EditError::NotApplicable {
            edit: "text",
            block_type: "quote".to_string(),
        }));
    }

    #[test]
    fn test_attach_upload() {
        let media = UploadedMedia { url: "/media/abc.png".to_string(), key: "abc.png".to_string() };
        let image = block(BlockKind::Image(Media::default()));
        let image = attach_upload(&image, &media).unwrap();
        assert_eq!(image.kind, BlockKind::Image(Media { url: "/media/abc.png".to_string(), caption: None }));

        let paragraph = block(BlockKind::Paragraph(Paragraph::default()));
        assert!(attach_upload(&paragraph, &media).is_err());
    }

    #[test]
    fn test_expanded_toggle_is_view_only() {
        let mut view = EditorViewState::default();
        let paragraph = block(BlockKind::Paragraph(Paragraph { text: "a".to_string() }));
        assert!(view.toggle_expanded(&paragraph));
        assert!(view.is_expanded(&paragraph.id));
        assert!(!view.toggle_expanded(&paragraph));
        assert!(!view.is_expanded(&paragraph.id));

        let image = ContentBlock::new(BlockId("7".to_string()), BlockKind::Image(Media::default()));
        assert!(!view.toggle_expanded(&image));
        assert!(!view.is_expanded(&image.id));
    }

    #[test]
    fn test_pending_item_submit() {
        let mut view = EditorViewState::default();
        let list = block(BlockKind::List(List::default()));

        assert_eq!(view.submit_pending_item(&list), Ok(None));

        view.set_pending_item(&list.id, "first");
        assert_eq!(view.pending_item(&list.id), "first");
        let updated = view.submit_pending_item(&list).unwrap().unwrap();
        assert_eq!(updated.kind, BlockKind::List(List { items: vec!["first".to_string()] }));
        assert_eq!(view.pending_item(&list.id), "");

        let paragraph = block(BlockKind::Paragraph(Paragraph::default()));
        view.set_pending_item(&paragraph.id, "stray");
        assert!(view.submit_pending_item(&paragraph).is_err());
        assert_eq!(view.pending_item(&paragraph.id), "stray");
    }
}
