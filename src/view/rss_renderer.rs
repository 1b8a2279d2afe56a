use std::io::Cursor;

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use crate::post::Post;

/* Example
<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
<channel>
  <title>Jane Doe</title>
  <link>https://jane.example.com</link>
  <description>Projects and notes</description>
  <item>
    <title>A block editor in Rust</title>
    <link>https://jane.example.com/projects/block-editor-in-rust</link>
    <guid isPermaLink="false">0b9f2a9e-3d5c-4a43-9d0c-7c3f6f1f2a11</guid>
    <description><![CDATA[Editing posts as typed content blocks]]></description>
    <pubDate>Sat, 9 Mar 2024 10:00:00 +0000</pubDate>
  </item>
</channel>
</rss>
*/

pub struct RssChannel<'a> {
    pub ch_title: &'a str,
    pub ch_link: &'a str,
    pub ch_desc: &'a str,
}

impl<'a> RssChannel<'a> {
    /// Posts are written in the given order. Callers sort and truncate.
    pub fn render(&self, posts: &[Post]) -> quick_xml::Result<Vec<u8>> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));

        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let mut rss = BytesStart::new("rss");
        rss.push_attribute(("version", "2.0"));
        writer.write_event(Event::Start(rss))?;
        writer.write_event(Event::Start(BytesStart::new("channel")))?;

        push_text(&mut writer, "title", self.ch_title)?;
        push_text(&mut writer, "link", self.ch_link)?;
        push_text(&mut writer, "description", self.ch_desc)?;

        for post in posts {
            writer.write_event(Event::Start(BytesStart::new("item")))?;

            push_text(&mut writer, "title", &post.title)?;
            push_text(&mut writer, "link", &full_link(self.ch_link, &post.slug))?;

            // Falls back to the slug for documents written without an id
            let guid = post.id.as_ref().map(|id| id.0.as_str()).unwrap_or(post.slug.as_str());
            let mut guid_elem = BytesStart::new("guid");
            guid_elem.push_attribute(("isPermaLink", "false"));
            writer.write_event(Event::Start(guid_elem))?;
            writer.write_event(Event::Text(BytesText::new(guid)))?;
            writer.write_event(Event::End(BytesEnd::new("guid")))?;

            push_cdata(&mut writer, "description", &post.description)?;
            push_text(&mut writer, "pubDate", &post.effective_date().to_rfc2822())?;

            writer.write_event(Event::End(BytesEnd::new("item")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("channel")))?;
        writer.write_event(Event::End(BytesEnd::new("rss")))?;

        Ok(writer.into_inner().into_inner())
    }
}

fn full_link(base_url: &str, slug: &str) -> String {
    format!("{}/projects/{}", base_url.trim_end_matches('/'), slug)
}

fn push_text(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

// `]]>` cannot appear inside one CDATA section, so the text is split across
// sections right after `]]`.
fn push_cdata(writer: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) -> quick_xml::Result<()> {
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    let pieces: Vec<&str> = text.split("]]>").collect();
    let last = pieces.len() - 1;
    for (i, piece) in pieces.into_iter().enumerate() {
        let mut section = String::new();
        if i > 0 {
            section.push('>');
        }
        section.push_str(piece);
        if i < last {
            section.push_str("]]");
        }
        writer.write_event(Event::CData(BytesCData::new(section.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::str;

    use chrono::{TimeZone, Utc};

    use crate::post::PostId;

    use super::*;

    fn create_post(id: &str) -> Post {
        Post {
            id: Some(PostId(id.to_string())),
            title: format!("title-of-post-{}", id),
            description: format!("summary-of-post-{}", id),
            slug: format!("post-{}", id),
            published_at: Some(Utc.with_ymd_and_hms(2024, 1, 2, 5, 6, 7).unwrap()),
            ..Post::default()
        }
    }

    #[test]
    fn render_xml() {
        let posts = vec![create_post("1"), create_post("2")];
        let rss = RssChannel {
            ch_title: "my feed",
            ch_link: "https://jane.example.com/",
            ch_desc: "Projects & notes",
        };
        let xml = rss.render(&posts).unwrap();
        assert_eq!(str::from_utf8(&xml).unwrap(), EXPECTED);
    }

    #[test]
    fn test_cdata_terminator_is_split() {
        let mut post = create_post("3");
        post.description = "a ]]> b ]]>".to_string();
        let rss = RssChannel { ch_title: "t", ch_link: "l", ch_desc: "d" };
        let xml = String::from_utf8(rss.render(&[post]).unwrap()).unwrap();
        assert!(xml.contains("<description><![CDATA[a ]]]]><![CDATA[> b ]]]]><![CDATA[>]]></description>"));

        let mut reader = quick_xml::Reader::from_str(&xml);
        let mut in_description = false;
        let mut description = String::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.name().as_ref() == b"description" => in_description = true,
                Event::End(e) if e.name().as_ref() == b"description" => in_description = false,
                Event::CData(e) if in_description => description.push_str(str::from_utf8(&e).unwrap()),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(description, "a ]]> b ]]>");
    }

    const EXPECTED: &str = r##"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>my feed</title><link>https://jane.example.com/</link><description>Projects &amp; notes</description><item><title>title-of-post-1</title><link>https://jane.example.com/projects/post-1</link><guid isPermaLink="false">1</guid><description><![CDATA[summary-of-post-1]]></description><pubDate>Tue, 2 Jan 2024 05:06:07 +0000</pubDate></item><item><title>title-of-post-2</title><link>https://jane.example.com/projects/post-2</link><guid isPermaLink="false">2</guid><description><![CDATA[summary-of-post-2]]></description><pubDate>Tue, 2 Jan 2024 05:06:07 +0000</pubDate></item></channel></rss>"##;
}
