use ramhorns::Template;

use crate::blocks::field_edit::{EditorViewState, CODE_LANGUAGES};
use crate::blocks::{BlockKind, BlockType, ContentBlock, HeadingLevel, NoteVariant};
use crate::draft::{Draft, DraftId, PostFields};
use crate::post::TechnologyEntry;
use crate::view::ViewOption;

#[derive(ramhorns::Content)]
struct ViewHeading {
    text: String,
    levels: Vec<ViewOption>,
    underline: bool,
    /// Underline only makes sense on level 2 headings.
    can_underline: bool,
}

#[derive(ramhorns::Content)]
struct ViewText {
    text: String,
}

#[derive(ramhorns::Content)]
struct ViewCode {
    code: String,
    title: String,
    languages: Vec<ViewOption>,
    show_line_numbers: bool,
}

#[derive(ramhorns::Content)]
struct ViewMedia {
    url: String,
    caption: String,
    accept: &'static str,
}

#[derive(ramhorns::Content)]
struct ViewNote {
    text: String,
    variants: Vec<ViewOption>,
}

#[derive(ramhorns::Content)]
struct ViewItem {
    index: usize,
    text: String,
}

#[derive(ramhorns::Content)]
struct ViewListItem {
    position: usize,
    text: String,
}

#[derive(ramhorns::Content)]
struct ViewList {
    items: Vec<ViewListItem>,
    pending_item: String,
}

#[derive(ramhorns::Content)]
struct ViewUnknown {
    type_name: String,
    raw: String,
}

#[derive(ramhorns::Content)]
struct ViewBlock {
    index: usize,
    id: String,
    type_name: String,
    label: String,
    first: bool,
    last: bool,
    up: usize,
    down: usize,
    can_expand: bool,
    expanded: bool,
    heading: Option<ViewHeading>,
    paragraph: Option<ViewText>,
    code: Option<ViewCode>,
    image: Option<ViewMedia>,
    video: Option<ViewMedia>,
    note: Option<ViewNote>,
    list: Option<ViewList>,
    separator: bool,
    unknown: Option<ViewUnknown>,
}

#[derive(ramhorns::Content)]
struct ViewTechnologyRow {
    index: usize,
    name: String,
    logo: String,
    dark_logo: String,
    link: String,
}

#[derive(ramhorns::Content)]
struct EditorPage<'a> {
    site_name: &'a str,
    draft_id: &'a str,
    is_new: bool,
    messages: Vec<ViewItem>,
    title: String,
    description: String,
    slug: String,
    tags: String,
    development: bool,
    design: bool,
    project_types: Vec<ViewOption>,
    pinned: bool,
    image: String,
    video: String,
    logo: String,
    demo: String,
    source: String,
    published_at: String,
    technologies: Vec<ViewTechnologyRow>,
    blocks: Vec<ViewBlock>,
    block_types: Vec<ViewOption>,
    pending_uploads: usize,
    unsaved: bool,
}

fn view_media(url: &str, caption: &Option<String>, accept: &'static str) -> ViewMedia {
    ViewMedia {
        url: url.to_string(),
        caption: caption.clone().unwrap_or_default(),
        accept,
    }
}

fn view_block(index: usize, count: usize, block: &ContentBlock, view: &EditorViewState) -> ViewBlock {
    let mut view_block = ViewBlock {
        index,
        id: block.id.0.clone(),
        type_name: block.type_name().to_string(),
        label: block.block_type().map(|t| t.label().to_string()).unwrap_or_else(|| block.type_name().to_string()),
        first: index == 0,
        last: index + 1 == count,
        up: index.saturating_sub(1),
        down: index + 1,
        can_expand: EditorViewState::can_expand(block),
        expanded: view.is_expanded(&block.id),
        heading: None,
        paragraph: None,
        code: None,
        image: None,
        video: None,
        note: None,
        list: None,
        separator: false,
        unknown: None,
    };

    match &block.kind {
        BlockKind::Heading(heading) => {
            view_block.heading = Some(ViewHeading {
                text: heading.text.clone(),
                levels: [HeadingLevel::H2, HeadingLevel::H3].into_iter()
                    .map(|level| {
                        let number = u8::from(level).to_string();
                        ViewOption::new(&number, &format!("H{}", number), level == heading.level)
                    })
                    .collect(),
                underline: heading.underline,
                can_underline: heading.level == HeadingLevel::H2,
            });
        }
        BlockKind::Paragraph(paragraph) => {
            view_block.paragraph = Some(ViewText { text: paragraph.text.clone() });
        }
        BlockKind::Code(code) => {
            view_block.code = Some(ViewCode {
                code: code.code.clone(),
                title: code.title.clone().unwrap_or_default(),
                languages: CODE_LANGUAGES.iter()
                    .map(|lang| ViewOption::new(lang, lang, *lang == code.language))
                    .collect(),
                show_line_numbers: code.show_line_numbers,
            });
        }
        BlockKind::Image(media) => view_block.image = Some(view_media(&media.url, &media.caption, "image/*")),
        BlockKind::Video(media) => view_block.video = Some(view_media(&media.url, &media.caption, "video/*")),
        BlockKind::Note(note) => {
            view_block.note = Some(ViewNote {
                text: note.text.clone(),
                variants: NoteVariant::ALL.into_iter()
                    .map(|v| ViewOption::new(v.as_str(), v.as_str(), v == note.variant))
                    .collect(),
            });
        }
        BlockKind::List(list) => {
            view_block.list = Some(ViewList {
                items: list.items.iter()
                    .enumerate()
                    .map(|(position, text)| ViewListItem { position, text: text.clone() })
                    .collect(),
                pending_item: view.pending_item(&block.id).to_string(),
            });
        }
        BlockKind::Separator => view_block.separator = true,
        BlockKind::Unknown(unknown) => {
            view_block.unknown = Some(ViewUnknown {
                type_name: unknown.type_name.clone(),
                raw: serde_json::to_string_pretty(&unknown.fields).unwrap_or_default(),
            });
        }
    }

    view_block
}

fn view_technology(index: usize, tech: &TechnologyEntry) -> ViewTechnologyRow {
    ViewTechnologyRow {
        index,
        name: tech.name.clone(),
        logo: tech.logo.clone(),
        dark_logo: tech.dark_logo.clone().unwrap_or_default(),
        link: tech.link.clone().unwrap_or_default(),
    }
}

pub fn render_editor(template: &Template, site_name: &str, draft_id: &DraftId, draft: &Draft) -> String {
    let fields = PostFields::from_post(&draft.post);
    let blocks = draft.editor.blocks();

    template.render(&EditorPage {
        site_name,
        draft_id: &draft_id.0,
        is_new: draft.post_id.is_none(),
        messages: draft.messages.iter()
            .enumerate()
            .map(|(index, text)| ViewItem { index, text: text.clone() })
            .collect(),
        title: fields.title,
        description: fields.description,
        slug: fields.slug,
        tags: fields.tags,
        development: fields.development.is_some(),
        design: fields.design.is_some(),
        project_types: ["personal", "professional"].into_iter()
            .map(|t| ViewOption::new(t, t, t == fields.project_type))
            .collect(),
        pinned: fields.pinned.is_some(),
        image: fields.image,
        video: fields.video,
        logo: fields.logo,
        demo: fields.demo,
        source: fields.source,
        published_at: fields.published_at,
        technologies: draft.post.technologies.iter()
            .enumerate()
            .map(|(index, tech)| view_technology(index, tech))
            .collect(),
        blocks: blocks.iter()
            .enumerate()
            .map(|(index, block)| view_block(index, blocks.len(), block, &draft.view))
            .collect(),
        block_types: BlockType::ALL.into_iter()
            .map(|t| ViewOption::new(t.as_str(), t.label(), false))
            .collect(),
        pending_uploads: draft.pending_uploads.len(),
        unsaved: draft.has_unsaved_changes(),
    })
}

#[cfg(test)]
mod tests {
    use crate::blocks::field_edit::{edit_block, BlockEdit};
    use crate::view::parse_template;

    use super::*;

    const BLOCKS_TPL: &str = "{{#blocks}}[{{index}}:{{type_name}}\
{{#heading}} h{{#levels}}{{#selected}}{{value}}{{/selected}}{{/levels}}{{#can_underline}} u{{/can_underline}}{{/heading}}\
{{#code}} {{#languages}}{{#selected}}{{value}}{{/selected}}{{/languages}}{{/code}}\
{{#list}} {{#items}}{{text}},{{/items}}+{{pending_item}}{{/list}}\
{{#unknown}} raw{{/unknown}}\
{{#expanded}} open{{/expanded}}{{#first}} first{{/first}}{{#last}} last{{/last}}]{{/blocks}}";

    #[test]
    fn test_render_blocks_editor() {
        let mut draft = Draft::new();
        draft.editor.add_block(BlockType::Heading);
        draft.editor.add_block(BlockType::Code);
        draft.editor.add_block(BlockType::List);

        let heading = edit_block(draft.editor.get(0).unwrap(), BlockEdit::Level(3)).unwrap();
        draft.editor.update_block(0, heading).unwrap();
        let code = edit_block(draft.editor.get(1).unwrap(), BlockEdit::Language("rust".to_string())).unwrap();
        draft.editor.update_block(1, code.clone()).unwrap();
        draft.view.toggle_expanded(&code);
        let list = edit_block(draft.editor.get(2).unwrap(), BlockEdit::AddItem("one".to_string())).unwrap();
        draft.view.set_pending_item(&list.id, "two");
        draft.editor.update_block(2, list).unwrap();

        let template = parse_template(BLOCKS_TPL.to_string(), "editor").unwrap();
        let html = render_editor(&template, "Folio", &DraftId("d".to_string()), &draft);
        assert_eq!(html, "[0:heading h3 first][1:code rust open][2:list one,+two last]");
    }

    #[test]
    fn test_render_fields() {
        let template = parse_template(
            "{{draft_id}}|{{#is_new}}new{{/is_new}}|{{title}}|{{#project_types}}{{#selected}}{{value}}{{/selected}}{{/project_types}}|{{#messages}}{{text}};{{/messages}}|{{#block_types}}{{value}},{{/block_types}}".to_string(),
            "editor",
        ).unwrap();
        let mut draft = Draft::new();
        draft.post.title = "<Folio>".to_string();
        draft.messages.push("Title is required".to_string());

        let html = render_editor(&template, "Folio", &DraftId("d1".to_string()), &draft);
        assert_eq!(html, "d1|new|&lt;Folio&gt;|personal|Title is required;|heading,paragraph,code,image,video,note,list,separator,");
    }

    #[test]
    fn test_render_unsaved_notice() {
        let template = parse_template("{{#unsaved}}unsaved{{/unsaved}}{{^unsaved}}clean{{/unsaved}}".to_string(), "editor").unwrap();
        let mut draft = Draft::new();
        assert_eq!(render_editor(&template, "Folio", &DraftId("d".to_string()), &draft), "clean");

        draft.editor.add_block(BlockType::Separator);
        assert_eq!(render_editor(&template, "Folio", &DraftId("d".to_string()), &draft), "unsaved");
    }
}
