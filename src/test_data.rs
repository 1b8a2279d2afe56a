#[cfg(test)]
pub const POST_JSON: &str = r#"{
  "id": "0b9f2a9e-3d5c-4a43-9d0c-7c3f6f1f2a11",
  "title": "A block editor in Rust",
  "description": "Building a content editor out of typed blocks",
  "slug": "block-editor-in-rust",
  "tags": ["rust", "editor", "web"],
  "category": "development,design",
  "projectType": "professional",
  "pinned": true,
  "media": {
    "image": "/media/cover.png"
  },
  "links": {
    "source": "https://example.com/folio"
  },
  "publishedAt": "2024-03-09T10:00:00Z",
  "createdAt": "2024-03-01T08:30:00Z",
  "updatedAt": "2024-03-09T10:00:00Z",
  "content": [
    {"id": "1709971200000", "type": "heading", "text": "Why blocks", "level": 2, "underline": true},
    {"id": "1709971200001", "type": "paragraph", "text": "Every post is a list of `ContentBlock` values. See [the code](https://example.com/folio)."},
    {"id": "1709971200002", "type": "code", "code": "```rust\nlet blocks: Vec<ContentBlock> = vec![];\n```", "title": "blocks.rs", "language": "rust", "showLineNumbers": true},
    {"id": "1709971200003", "type": "image", "url": "/media/diagram.png", "caption": "Editor and renderer"},
    {"id": "1709971200004", "type": "note", "text": "Unknown block types are kept as they are.", "variant": "tip"},
    {"id": "1709971200005", "type": "list", "items": ["Heading", "Paragraph", "Code"]},
    {"id": 1709971200006, "type": "separator"},
    {"id": "1709971200007", "type": "heading", "text": "Next steps", "level": 3},
    {"id": "1709971200008", "type": "quote", "text": "Make it work, then make it right.", "author": "Kent Beck"}
  ],
  "technologies": [
    {"name": "Rust", "logo": "/media/rust.svg", "darkLogo": "/media/rust-dark.svg", "link": "https://www.rust-lang.org"},
    {"name": "ntex", "logo": "/media/ntex.png"}
  ]
}"#;

#[cfg(test)]
pub const ABOUT_MD: &str = "# About me

I build **software** and sometimes design it.

- Rust
- Web
";
