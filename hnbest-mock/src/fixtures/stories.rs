use hnbest_core::{ItemId, UpstreamItem};

fn story(
    id: ItemId,
    by: &str,
    score: i64,
    time: i64,
    title: &str,
    url: Option<&str>,
    kids: &[ItemId],
) -> UpstreamItem {
    UpstreamItem {
        id,
        by: by.to_string(),
        score,
        time,
        title: Some(title.to_string()),
        url: url.map(str::to_string),
        kids: if kids.is_empty() {
            None
        } else {
            Some(kids.to_vec())
        },
        kind: Some("story".to_string()),
    }
}

/// Ranked id list served for `beststories.json`. The last id has no record.
pub const BEST_IDS: &[ItemId] = &[8863, 121_003, 2_921_983, 192_327, 9_999_999];

pub fn items() -> Vec<UpstreamItem> {
    vec![
        story(
            8863,
            "dhouston",
            111,
            1_175_714_200,
            "My YC app: Dropbox - Throw away your USB drive",
            Some("http://www.getdropbox.com/u/2/screencast.html"),
            &[8952, 9224, 8917, 8884, 8887],
        ),
        story(
            121_003,
            "tel",
            25,
            1_203_647_620,
            "Ask HN: The Arc Effect",
            None,
            &[121_016, 121_109],
        ),
        story(
            2_921_983,
            "norvig",
            1_320,
            1_314_211_127,
            "Norvig's Spell Corrector",
            Some("http://norvig.com/spell-correct.html"),
            &[2_922_097, 2_922_429, 2_924_562],
        ),
        story(
            192_327,
            "justin",
            6,
            1_210_981_217,
            "Justin.tv is looking for a Lead Flash Engineer!",
            None,
            &[],
        ),
    ]
}
