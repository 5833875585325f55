use hnbest_core::{PublicStoryView, sort_by_score_desc};
use proptest::prelude::*;

fn story(idx: usize, score: i64) -> PublicStoryView {
    PublicStoryView {
        title: format!("story-{idx}"),
        uri: None,
        posted_by: "someone".into(),
        time: "1970-01-01T00:00:00+00:00".into(),
        score,
        comment_count: 0,
    }
}

proptest! {
    #[test]
    fn scores_are_non_increasing(scores in proptest::collection::vec(-1_000i64..10_000, 0..200)) {
        let mut stories: Vec<_> = scores.iter().enumerate().map(|(i, s)| story(i, *s)).collect();
        sort_by_score_desc(&mut stories);
        prop_assert_eq!(stories.len(), scores.len());
        prop_assert!(stories.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn equal_scores_keep_input_order(n in 1usize..50, score in 0i64..500) {
        let mut stories: Vec<_> = (0..n).map(|i| story(i, score)).collect();
        sort_by_score_desc(&mut stories);
        for (i, s) in stories.iter().enumerate() {
            prop_assert_eq!(&s.title, &format!("story-{i}"));
        }
    }
}
