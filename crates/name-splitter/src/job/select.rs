//! Page selection

use crate::types::*;

/// Choose which cells (0-based) to render out of `total`.
///
/// A 1-based `test_page` overrides every filter. Otherwise the 1-based
/// `skip` entries are removed first (out-of-range entries are ignored) and
/// `parity` then keeps odd or even *positions within the remaining list*.
pub fn select_pages(
    total: usize,
    test_page: Option<usize>,
    skip: &[u32],
    parity: PageParity,
) -> Result<Vec<usize>> {
    if let Some(page) = test_page {
        if page == 0 || page > total {
            return Err(SplitError::InvalidArgument(format!(
                "test_page must be between 1 and {total}"
            )));
        }
        return Ok(vec![page - 1]);
    }

    let remaining = (0..total).filter(|index| !skip.contains(&(*index as u32 + 1)));
    let selected = remaining
        .enumerate()
        .filter(|(position, _)| match parity {
            PageParity::All => true,
            // Positions are 1-based: even index = odd position
            PageParity::Odd => position % 2 == 0,
            PageParity::Even => position % 2 == 1,
        })
        .map(|(_, index)| index)
        .collect();
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all(total: usize) -> Vec<usize> {
        select_pages(total, None, &[], PageParity::All).unwrap()
    }

    #[test]
    fn test_all_pages() {
        assert_eq!(all(5), vec![0, 1, 2, 3, 4]);
        assert!(all(0).is_empty());
    }

    #[test]
    fn test_single_test_page() {
        assert_eq!(select_pages(16, Some(3), &[], PageParity::All).unwrap(), vec![2]);
        assert_eq!(select_pages(4, Some(1), &[], PageParity::All).unwrap(), vec![0]);
        assert_eq!(select_pages(4, Some(4), &[], PageParity::All).unwrap(), vec![3]);
    }

    #[test]
    fn test_test_page_overrides_filters() {
        let pages = select_pages(5, Some(3), &[1, 2], PageParity::Even).unwrap();
        assert_eq!(pages, vec![2]);
    }

    #[test]
    fn test_test_page_out_of_range() {
        for page in [0, 5] {
            let err = select_pages(4, Some(page), &[], PageParity::All).unwrap_err();
            assert!(matches!(err, SplitError::InvalidArgument(_)));
            assert!(err.to_string().contains("test_page must be between 1 and 4"));
        }
    }

    #[test]
    fn test_skip() {
        assert_eq!(select_pages(5, None, &[1], PageParity::All).unwrap(), vec![1, 2, 3, 4]);
        assert_eq!(select_pages(5, None, &[1, 3, 5], PageParity::All).unwrap(), vec![1, 3]);
        assert_eq!(select_pages(3, None, &[0, 4, 99], PageParity::All).unwrap(), vec![0, 1, 2]);
        assert!(select_pages(3, None, &[1, 2, 3], PageParity::All).unwrap().is_empty());
    }

    #[test]
    fn test_parity() {
        assert_eq!(select_pages(5, None, &[], PageParity::Odd).unwrap(), vec![0, 2, 4]);
        assert_eq!(select_pages(5, None, &[], PageParity::Even).unwrap(), vec![1, 3]);
    }

    #[test]
    fn test_parity_applies_after_skip() {
        // Remaining [0, 2, 3, 4]; odd positions 1 and 3
        assert_eq!(select_pages(5, None, &[2], PageParity::Odd).unwrap(), vec![0, 3]);
        // Remaining [1, 2, 3, 4]; even positions 2 and 4
        assert_eq!(select_pages(5, None, &[1], PageParity::Even).unwrap(), vec![2, 4]);
    }
}
