/// Splits a list in pages of `page_size`. Pages are numbered from 1.
pub struct Paginator<'a, T> {
    items: &'a [T],
    page_size: usize,
    page_count: usize,
}

impl<'a, T> Paginator<'a, T> {
    pub fn new(items: &'a [T], page_size: usize) -> Self {
        let page_size = page_size.max(1);
        let page_count = items.len().div_ceil(page_size);
        Paginator {
            items,
            page_size,
            page_count,
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// Out of range page numbers fall back to the first page.
    pub fn clamp_page(&self, page: usize) -> usize {
        match page {
            x if x == 0 || x > self.page_count => 1,
            x => x,
        }
    }

    pub fn get_page(&self, page: usize) -> Result<&'a [T], String> {
        match page {
            0 => return Err("Page has to be greater than 0".to_string()),
            x if x > self.page_count => return Err(format!("Page has to be less than page_count ({})", self.page_count)),
            _ => {}
        };

        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        Ok(&self.items[start..end])
    }
}
