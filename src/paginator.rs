/// 1-based paging over a post list, as the HTML views present it. Distinct
/// from the JSON API's 0-based slice semantics: here an out-of-range page is
/// `None` so callers can clamp back to page 1.
pub struct Paginator<'a, T> {
    items: &'a [T],
    page_size: usize,
}

impl<'a, T> Paginator<'a, T> {
    pub fn new(items: &'a [T], page_size: usize) -> Paginator<'a, T> {
        Paginator { items, page_size }
    }

    pub fn page_count(&self) -> usize {
        self.items.len().div_ceil(self.page_size.max(1))
    }

    pub fn page(&self, page: usize) -> Option<&'a [T]> {
        if page == 0 || page > self.page_count() {
            return None;
        }
        let start = (page - 1) * self.page_size;
        let end = (start + self.page_size).min(self.items.len());
        Some(&self.items[start..end])
    }

    /// The requested page, or page 1 when out of range.
    pub fn page_or_first(&self, page: usize) -> (usize, &'a [T]) {
        match self.page(page) {
            Some(slice) => (page, slice),
            None => (1, self.page(1).unwrap_or(&[])),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pages_cover_all_items() {
        let items: Vec<u32> = (1..=13).collect();
        let paginator = Paginator::new(&items, 3);
        assert_eq!(paginator.page_count(), 5);
        assert_eq!(paginator.page(1), Some(&[1, 2, 3][..]));
        assert_eq!(paginator.page(4), Some(&[10, 11, 12][..]));
        assert_eq!(paginator.page(5), Some(&[13][..]));
        assert_eq!(paginator.page(0), None);
        assert_eq!(paginator.page(6), None);
    }

    #[test]
    fn test_empty_list() {
        let items: Vec<u32> = vec![];
        let paginator = Paginator::new(&items, 3);
        assert_eq!(paginator.page_count(), 0);
        assert_eq!(paginator.page(1), None);
        let (page, slice) = paginator.page_or_first(7);
        assert_eq!(page, 1);
        assert!(slice.is_empty());
    }

    #[test]
    fn test_out_of_range_clamps_to_first() {
        let items: Vec<u32> = (1..=4).collect();
        let paginator = Paginator::new(&items, 2);
        let (page, slice) = paginator.page_or_first(9);
        assert_eq!(page, 1);
        assert_eq!(slice, &[1, 2]);
    }
}
