use chrono::{Duration, Utc};
use murmur_api::CaptureEvent;
use rand::{seq::SliceRandom, Rng};
use serde_json::{json, Value};

const AWEME_ID: &str = "7300000000000000001";

const NUM_TOP_LEVEL: usize = 120;
const PAGE_SIZE: usize = 20;
const MAX_REPLIES: usize = 12;
const REPLY_PAGE_SIZE: usize = 5;
const INLINE_REPLIES: usize = 1;

const NUM_USERS: usize = 25;
const COMMENT_WORD_COUNT: usize = 12;

// share of deliveries that are sent twice, in percent
const DUPLICATE_RATE: u32 = 10;

struct Comment {
    cid: String,
    user: usize,
    text: String,
    likes: u64,
    create_time: i64,
    replies: Vec<Comment>,
}

fn gen_comment(rng: &mut impl Rng, cid: String, create_time: i64) -> Comment {
    Comment {
        cid,
        user: rng.gen_range(0..NUM_USERS),
        text: lipsum::lipsum_words(rng.gen_range(1..=COMMENT_WORD_COUNT)),
        likes: rng.gen_range(0..1000),
        create_time,
        replies: Vec::new(),
    }
}

fn record(c: &Comment, reply_to: Option<&str>, inline: &[Comment]) -> Value {
    json!({
        "cid": c.cid,
        "user": {
            "unique_id": format!("user{}", c.user),
            "nickname": format!("User {}", c.user),
        },
        "text": c.text,
        "digg_count": c.likes,
        "reply_comment_total": c.replies.len(),
        "create_time": c.create_time,
        "reply_id": reply_to.unwrap_or("0"),
        "is_author_digged": rand::random::<bool>() as u8,
        "reply_comment": inline
            .iter()
            .map(|r| record(r, Some(&c.cid), &[]))
            .collect::<Vec<_>>(),
    })
}

fn listing(records: Vec<Value>, cursor: usize, has_more: bool, total: usize) -> Value {
    json!({
        "status_code": 0,
        "comments": records,
        "cursor": cursor,
        "has_more": has_more as u8,
        "total": total,
    })
}

fn main() {
    let mut rng = rand::thread_rng();
    let start = Utc::now() - Duration::days(2);
    let epoch = start.timestamp();

    let comments = (0..NUM_TOP_LEVEL)
        .map(|i| {
            let time = epoch + rng.gen_range(0..86_400);
            let mut c = gen_comment(&mut rng, format!("{}", 7_000_000 + i), time);
            c.replies = (0..rng.gen_range(0..=MAX_REPLIES))
                .map(|j| {
                    let offset = rng.gen_range(1..3_600);
                    gen_comment(&mut rng, format!("{}", 8_000_000 + i * 100 + j), time + offset)
                })
                .collect();
            c
        })
        .collect::<Vec<_>>();

    let mut events = Vec::new();
    for (page, chunk) in comments.chunks(PAGE_SIZE).enumerate() {
        let cursor = (page + 1) * PAGE_SIZE;
        let url = format!(
            "/api/comment/list/?aweme_id={AWEME_ID}&cursor={}&count={PAGE_SIZE}",
            page * PAGE_SIZE
        );
        let records = chunk
            .iter()
            .map(|c| record(c, None, &c.replies[..INLINE_REPLIES.min(c.replies.len())]))
            .collect();
        let has_more = cursor < comments.len();
        events.push((url, listing(records, cursor, has_more, comments.len())));

        for parent in chunk.iter().filter(|c| !c.replies.is_empty()) {
            for (page, replies) in parent.replies.chunks(REPLY_PAGE_SIZE).enumerate() {
                let cursor = (page + 1) * REPLY_PAGE_SIZE;
                let url = format!(
                    "/api/comment/list/reply/?comment_id={}&item_id={AWEME_ID}&cursor={}&count={REPLY_PAGE_SIZE}",
                    parent.cid,
                    page * REPLY_PAGE_SIZE
                );
                let records = replies
                    .iter()
                    .map(|r| record(r, Some(&parent.cid), &[]))
                    .collect();
                let has_more = cursor < parent.replies.len();
                events.push((url, listing(records, cursor, has_more, parent.replies.len())));
            }
        }
    }

    // the page delivers some listings twice, and not always in order
    let duplicates = events
        .iter()
        .filter(|_| rng.gen_ratio(DUPLICATE_RATE, 100))
        .cloned()
        .collect::<Vec<_>>();
    events.extend(duplicates);
    let shuffle_start = PAGE_SIZE.min(events.len());
    events[shuffle_start..].shuffle(&mut rng);

    for (url, body) in events {
        let event = CaptureEvent::now(url, body);
        println!(
            "{}",
            serde_json::to_string(&event).expect("capture events serialize")
        );
    }
}
