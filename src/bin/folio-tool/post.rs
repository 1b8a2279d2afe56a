use std::path::Path;

use anyhow::{anyhow, bail, Result};

use folio::blocks::editor::BlockEditor;
use folio::blocks::field_edit::{edit_block, BlockEdit};
use folio::blocks::BlockType;
use folio::post::slug::slug_from_title;
use folio::post::{Category, CategorySet, Post};
use folio::store::{DocumentStore, JsonFileStore};

use crate::{PostArgs, PostOutput};

const SAMPLE_BODY: &str = "Describe the project here. Use `code` spans and [links](https://example.com) freely.";

/// Starting block sequence: an underlined heading and one paragraph.
fn sample_blocks() -> Result<BlockEditor> {
    let mut editor = BlockEditor::new(vec![]);
    editor.add_block(BlockType::Heading);
    editor.add_block(BlockType::Paragraph);

    let edits = [
        (0, BlockEdit::Text("Overview".to_string())),
        (0, BlockEdit::Underline(true)),
        (1, BlockEdit::Text(SAMPLE_BODY.to_string())),
    ];
    for (index, edit) in edits {
        let block = editor.get(index).ok_or_else(|| anyhow!("Missing sample block {}", index))?;
        let updated = edit_block(block, edit)?;
        editor.update_block(index, updated)?;
    }
    Ok(editor)
}

fn build_post(args: &PostArgs) -> Result<Post> {
    let slug = slug_from_title(&args.title);
    if slug.is_empty() {
        bail!("Cannot build a slug out of '{}'", args.title);
    }

    let category = args.category.iter()
        .map(|c| c.parse::<Category>())
        .collect::<Result<CategorySet, String>>()
        .map_err(|e| anyhow!(e))?;

    Ok(Post {
        title: args.title.clone(),
        description: args.description.clone(),
        slug,
        category,
        project_type: args.project_type,
        content: sample_blocks()?.blocks().to_vec(),
        ..Post::default()
    })
}

pub fn post_cmd(args: PostArgs) -> Result<()> {
    let post = build_post(&args)?;

    match args.output {
        PostOutput::Stdout => println!("{}", serde_json::to_string_pretty(&post)?),
        PostOutput::Store => {
            let data_dir = args.data_dir.as_deref()
                .ok_or_else(|| anyhow!("--data-dir is required with --output store"))?;
            let mut store = JsonFileStore::open(Path::new(data_dir))?;
            let stored = store.create(post)?;
            let id = stored.id.map(|id| id.0).unwrap_or_default();
            println!("Created post {} with id {}", stored.slug, id);
        }
    }
    Ok(())
}
