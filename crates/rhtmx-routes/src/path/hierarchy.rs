/// Ancestors of a canonical request path, nearest first
///
/// `/shop/shoes/reviews` walks `/shop/shoes/reviews`, `/shop/shoes`,
/// `/shop`, `/`. The matcher uses it to find the closest matchable
/// ancestor whose chain carries a not-found boundary.
///
/// ```
/// use rhtmx_routes::path::PathHierarchy;
///
/// let walk: Vec<&str> = PathHierarchy::new("/shop/shoes/reviews").collect();
/// assert_eq!(walk, vec!["/shop/shoes/reviews", "/shop/shoes", "/shop", "/"]);
/// ```
#[derive(Debug, Clone)]
pub struct PathHierarchy<'a> {
    next: Option<&'a str>,
}

impl<'a> PathHierarchy<'a> {
    pub fn new(path: &'a str) -> Self {
        Self { next: Some(path) }
    }
}

impl<'a> Iterator for PathHierarchy<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let path = self.next.take()?;
        if path != "/" {
            self.next = path.rsplit_once('/').map(|(parent, _)| {
                if parent.is_empty() {
                    "/"
                } else {
                    parent
                }
            });
        }
        Some(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_yields_itself_once() {
        assert_eq!(PathHierarchy::new("/").collect::<Vec<_>>(), vec!["/"]);
    }

    #[test]
    fn test_walk_can_resume_after_find() {
        let mut walk = PathHierarchy::new("/docs/v1/intro/setup");
        assert_eq!(walk.find(|p| p.ends_with("v1")), Some("/docs/v1"));
        assert_eq!(walk.next(), Some("/docs"));
        assert_eq!(walk.next(), Some("/"));
        assert_eq!(walk.next(), None);
    }
}
