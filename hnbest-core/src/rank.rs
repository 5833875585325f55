use crate::PublicStoryView;

/// Order stories by score, highest first.
///
/// The sort is stable: stories with equal scores keep their relative
/// (arrival) order.
pub fn sort_by_score_desc(stories: &mut [PublicStoryView]) {
    stories.sort_by(|a, b| b.score.cmp(&a.score));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn story(title: &str, score: i64) -> PublicStoryView {
        PublicStoryView {
            title: title.to_string(),
            uri: None,
            posted_by: String::new(),
            time: "1970-01-01T00:00:00+00:00".to_string(),
            score,
            comment_count: 0,
        }
    }

    #[test]
    fn ties_keep_arrival_order() {
        let mut v = vec![story("a", 5), story("b", 9), story("c", 5), story("d", 9)];
        sort_by_score_desc(&mut v);
        let titles: Vec<_> = v.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["b", "d", "a", "c"]);
    }
}
