use std::path::Path;

use anyhow::{bail, Result};

use folio::post::validation::validate_post;
use folio::store::{DocumentStore, JsonFileStore};

use crate::ValidateArgs;

pub fn validate_cmd(args: ValidateArgs) -> Result<()> {
    let store = JsonFileStore::open(Path::new(&args.data_dir))?;
    let posts = store.list();

    let mut invalid = 0;
    for post in posts.iter() {
        if let Err(errors) = validate_post(post) {
            invalid += 1;
            let id = post.id.as_ref().map(|id| id.0.as_str()).unwrap_or("?");
            println!("{} ({}):", post.slug, id);
            for error in errors {
                println!("  - {}", error);
            }
        }
    }

    println!("{} posts checked, {} invalid", posts.len(), invalid);
    if invalid > 0 {
        bail!("{} invalid posts in {}", invalid, args.data_dir);
    }
    Ok(())
}
