use std::{sync::Arc, time::Duration};

use futures::StreamExt;
use murmur_api::{
    bus, AutomationError, FinishReason, WorkerReceiver, WorkerRequest, WorkerSender,
};
use murmur_mock_page::{MockDom, MockPage, MockSite};
use murmur_page::{Dom, Driver, DriverConfig, Locators, LoopState, NodeId, Step, CLICKED_MARKER};

fn init_tracing() {
    if std::env::var("RUST_LOG").is_ok() {
        let _ = tracing_subscriber::fmt::try_init();
    }
}

fn fast_config() -> DriverConfig {
    DriverConfig {
        scroll_interval_min: Duration::from_millis(5),
        scroll_interval_max: Duration::from_millis(10),
        container_retry_delay: Duration::from_millis(5),
        panel_wait_timeout: Duration::from_millis(50),
        panel_poll_interval: Duration::from_millis(5),
        ..DriverConfig::default()
    }
}

/// An open comment panel, scrollable, without any comment
fn open_panel() -> (MockDom, NodeId) {
    let dom = MockDom::new("https://www.tiktok.com/@a/video/1", "video");
    let panel = dom.add(None, "div");
    dom.set_attr(panel, "class", "DivCommentMain-a1");
    dom.set_scrollable(panel, true);
    let list = dom.add(Some(panel), "div");
    dom.set_attr(list, "data-e2e", "comment-list");
    (dom, panel)
}

fn expand_button(dom: &MockDom, parent: NodeId, text: &str) -> NodeId {
    let action = dom.add(Some(parent), "div");
    dom.set_attr(action, "class", "DivReplyActionContainer-x");
    let button = dom.add(Some(action), "button");
    dom.set_text(button, text);
    button
}

fn worker_channel() -> (WorkerSender, WorkerReceiver) {
    bus::channel()
}

#[test]
fn loop_finishes_after_stale_iterations() {
    let (dom, panel) = open_panel();
    let config = DriverConfig::default();
    let mut state = LoopState::default();

    assert_eq!(state.step(&dom, &config, Some(5)), Step::Continue);
    assert_eq!(state.last_seen, 5);
    assert_eq!(state.step(&dom, &config, Some(5)), Step::Continue);
    assert_eq!(state.step(&dom, &config, None), Step::Continue);
    assert_eq!(
        state.step(&dom, &config, Some(5)),
        Step::Finished(FinishReason::Exhausted)
    );
    assert_eq!(dom.scrolls(panel), 3);
}

#[test]
fn loop_finishes_on_the_third_unchanged_count() {
    let (dom, panel) = open_panel();
    let config = DriverConfig::default();
    let mut state = LoopState::starting_at(5);

    assert_eq!(state.step(&dom, &config, Some(5)), Step::Continue);
    assert_eq!(state.step(&dom, &config, Some(5)), Step::Continue);
    assert_eq!(
        state.step(&dom, &config, Some(5)),
        Step::Finished(FinishReason::Exhausted)
    );
    assert_eq!(dom.scrolls(panel), 2);
}

#[test]
fn new_comments_reset_the_stale_counter() {
    let (dom, _) = open_panel();
    let config = DriverConfig::default();
    let mut state = LoopState::default();

    for count in [None, None, Some(3), None, None, Some(4), None, None] {
        assert_eq!(state.step(&dom, &config, count), Step::Continue);
    }
    assert_eq!(state.no_data, 2);
    assert_eq!(state.last_seen, 4);
}

#[test]
fn missing_container_is_retried_then_given_up() {
    let dom = MockDom::new("", "");
    let config = DriverConfig::default();
    let mut state = LoopState::default();

    for _ in 1..config.max_container_retries {
        assert_eq!(state.step(&dom, &config, None), Step::RetryContainer);
    }
    assert_eq!(
        state.step(&dom, &config, None),
        Step::Finished(FinishReason::ContainerNotFound)
    );
}

#[test]
fn finding_the_container_resets_its_retries() {
    let dom = MockDom::new("", "");
    let config = DriverConfig::default();
    let mut state = LoopState::default();
    for _ in 0..5 {
        state.step(&dom, &config, None);
    }
    assert_eq!(state.container_retries, 5);

    let panel = dom.add(None, "div");
    dom.set_attr(panel, "class", "DivCommentMain");
    dom.set_scrollable(panel, true);
    assert_eq!(state.step(&dom, &config, None), Step::Continue);
    assert_eq!(state.container_retries, 0);
}

#[test]
fn each_expand_control_is_clicked_once() {
    let (dom, panel) = open_panel();
    let first = expand_button(&dom, panel, "View 3 replies");
    let more = expand_button(&dom, panel, "View 12 more replies");
    let hidden = expand_button(&dom, panel, "View 1 reply");
    dom.set_visible(hidden, false);
    let hide = expand_button(&dom, panel, "Hide");
    let config = DriverConfig::default();
    let mut state = LoopState::default();

    state.no_data = 1;
    assert_eq!(state.step(&dom, &config, None), Step::Continue);
    assert_eq!(state.no_data, 0, "clicking counts as progress");
    assert_eq!(dom.attribute(first, CLICKED_MARKER).as_deref(), Some("1"));

    state.step(&dom, &config, None);
    assert_eq!(dom.clicks(first), 1);
    assert_eq!(dom.clicks(more), 1);
    assert_eq!(dom.clicks(hidden), 0);
    assert_eq!(dom.clicks(hide), 0);
    assert_eq!(state.no_data, 1);
}

#[test]
fn locators_fall_back_in_order() {
    let dom = MockDom::new("", "");
    let locators = Locators::default();
    assert_eq!(locators.open_control.locate_visible(&dom), None);

    let button = dom.add(None, "div");
    dom.set_attr(button, "role", "button");
    dom.set_attr(button, "aria-label", "Read or add Comments");
    assert_eq!(locators.open_control.locate_visible(&dom), Some(button));

    let icon = dom.add(None, "span");
    dom.set_attr(icon, "data-e2e", "comment-icon");
    assert_eq!(locators.open_control.locate_visible(&dom), Some(icon));

    dom.set_visible(icon, false);
    assert_eq!(locators.open_control.locate_visible(&dom), Some(button));

    // the container is found through the list when the panel has no known class
    let outer = dom.add(None, "section");
    dom.set_scrollable(outer, true);
    let wrapper = dom.add(Some(outer), "div");
    let list = dom.add(Some(wrapper), "div");
    dom.set_attr(list, "data-e2e", "comment-list");
    assert_eq!(locators.container.locate(&dom), Some(outer));
}

#[tokio::test]
async fn begin_opens_the_panel() {
    init_tracing();
    let page = MockPage::new(MockSite::generate(0, 0), false);
    let (worker, _worker_rx) = worker_channel();
    let driver = Driver::new(page.dom(), fast_config(), worker);

    assert!(!page.dom().is_visible(page.panel()));
    assert_eq!(driver.begin().await, Ok(true));
    assert!(page.dom().is_visible(page.panel()));
    assert!(driver.is_running());

    // beginning again only acknowledges
    assert_eq!(driver.begin().await, Ok(false));
    assert_eq!(page.dom().clicks(page.icon()), 1);

    assert!(driver.stop());
    assert!(!driver.stop());
    assert!(!driver.is_running());
}

#[tokio::test]
async fn begin_with_an_open_panel_does_not_click() {
    let page = MockPage::new(MockSite::generate(0, 0), true);
    let (worker, _worker_rx) = worker_channel();
    let driver = Driver::new(page.dom(), fast_config(), worker);

    assert_eq!(driver.begin().await, Ok(false));
    assert_eq!(page.dom().clicks(page.icon()), 0);
    driver.stop();
}

#[tokio::test]
async fn begin_without_control_is_refused() {
    let (worker, _worker_rx) = worker_channel();
    let driver = Driver::new(Arc::new(MockDom::new("", "")), fast_config(), worker);

    assert_eq!(driver.begin().await, Err(AutomationError::ControlNotFound));
    assert!(!driver.is_running());
}

#[tokio::test]
async fn begin_gives_up_when_the_panel_stays_closed() {
    let dom = Arc::new(MockDom::new("", ""));
    let icon = dom.add(None, "div");
    dom.set_attr(icon, "data-e2e", "comment-icon");
    let list = dom.add(None, "div");
    dom.set_attr(list, "data-e2e", "comment-list");
    dom.set_visible(list, false);
    let (worker, _worker_rx) = worker_channel();
    let driver = Driver::new(dom.clone(), fast_config(), worker);

    assert_eq!(driver.begin().await, Err(AutomationError::DidNotOpen));
    assert_eq!(dom.clicks(icon), 1);
    assert!(!driver.is_running());
}

#[tokio::test]
async fn idle_loop_tells_the_worker_it_finished() {
    init_tracing();
    let (dom, panel) = open_panel();
    let dom = Arc::new(dom);
    let (worker, mut worker_rx) = worker_channel();
    let driver = Driver::new(dom.clone(), fast_config(), worker);

    assert_eq!(driver.begin().await, Ok(false));
    let env = tokio::time::timeout(Duration::from_secs(5), worker_rx.next())
        .await
        .expect("loop never finished")
        .expect("worker channel closed");
    assert_eq!(
        *env.request(),
        WorkerRequest::LoopFinished {
            reason: FinishReason::Exhausted
        }
    );
    assert!(!driver.is_running());
    assert!(!driver.stop());
    assert_eq!(dom.scrolls(panel), 2);
}

#[tokio::test]
async fn comments_loaded_while_opening_are_not_progress() {
    init_tracing();
    let page = MockPage::new(MockSite::generate(0, 0), false);
    page.spawn();
    let (worker, mut worker_rx) = worker_channel();
    let driver = Driver::new(page.dom(), fast_config(), worker);

    // reported while begin waits for the panel
    let (began, ()) = futures::join!(driver.begin(), async { driver.report_progress(5) });
    assert_eq!(began, Ok(true));
    driver.report_progress(5);

    let env = tokio::time::timeout(Duration::from_secs(5), worker_rx.next())
        .await
        .expect("loop never finished")
        .expect("worker channel closed");
    assert_eq!(
        *env.request(),
        WorkerRequest::LoopFinished {
            reason: FinishReason::Exhausted
        }
    );
    assert_eq!(page.dom().scrolls(page.panel()), 2);
}

#[tokio::test]
async fn progress_keeps_the_loop_running() {
    let (dom, _) = open_panel();
    let (worker, mut worker_rx) = worker_channel();
    let driver = Driver::new(Arc::new(dom), fast_config(), worker);

    driver.begin().await.expect("beginning");
    for count in 1..=20 {
        driver.report_progress(count);
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(driver.is_running());
    assert!(driver.stop());
    assert!(
        tokio::time::timeout(Duration::from_millis(100), worker_rx.next())
            .await
            .is_err(),
        "a stopped loop sends nothing"
    );
}
