mod common;

use common::*;
use narrate_drivers::page::{BrowserPage, VisibleContent, VisibleLink};
use narrate_nav::convergence::{ChangeSignal, ConvergenceDetector, ConvergenceOptions, Settled};
use narrate_nav::extract::{ContentExtractor, FragmentSource};
use narrate_nav::registry::{discover, ElementDescriptor};
use narrate_nav::resolver::{ClickMethod, ElementResolver};
use std::time::Duration;

const URL: &str = "https://site.test/";

// ----- extraction ----------------------------------------------------------

#[tokio::test]
async fn largest_match_of_the_first_qualifying_selector_wins() {
    let page = FakePage::new(vec![]).showing(
        FakeDocument::new(URL)
            .with_container("article", "<article>tiny</article>")
            .with_container("main", &article("Small"))
            .with_container("main", &article("A much longer main section")),
    );
    let fragment = ContentExtractor::new(FakeClock::default()).extract(&page).await;
    assert_eq!(fragment.source, FragmentSource::Container("main"));
    assert!(fragment.html.contains("A much longer main section"));
}

#[tokio::test]
async fn sparse_pages_fall_back_to_visible_content() {
    let mut doc = FakeDocument::new(URL).with_container("section", "<section>Hi</section>");
    doc.visible = VisibleContent {
        title: "Login".into(),
        texts: vec!["Welcome back".into()],
        links: vec![VisibleLink {
            text: "Forgot password".into(),
            href: "/reset".into(),
        }],
        buttons: vec!["Sign in".into()],
        inputs: vec!["email: Email address".into()],
    };
    let page = FakePage::new(vec![]).showing(doc);

    let fragment = ContentExtractor::new(FakeClock::default()).extract(&page).await;
    assert_eq!(fragment.source, FragmentSource::VisibleContent);
    assert!(fragment.html.contains("<title>Login</title>"));
    assert!(fragment.html.contains("<a href=\"/reset\">Forgot password</a>"));
    assert!(fragment.html.contains("<button>Sign in</button>"));
}

#[tokio::test]
async fn cleaned_body_then_page_source() {
    let page = FakePage::new(vec![])
        .showing(FakeDocument::new(URL).with_cleaned_body("<body><p>clean</p></body>"));
    let fragment = ContentExtractor::new(FakeClock::default()).extract(&page).await;
    assert_eq!(fragment.source, FragmentSource::CleanedBody);

    page.show(FakeDocument::new(URL));
    let fragment = ContentExtractor::new(FakeClock::default()).extract(&page).await;
    assert_eq!(fragment.source, FragmentSource::PageSource);
    assert!(fragment.html.contains(URL));
}

#[tokio::test]
async fn extraction_never_fails_even_without_a_browser() {
    let fragment = ContentExtractor::new(FakeClock::default())
        .extract(&FakePage::broken())
        .await;
    assert_eq!(fragment.source, FragmentSource::Empty);
    assert!(fragment.html.is_empty());
}

#[tokio::test]
async fn scroll_probe_moves_and_resets() {
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_container("article", &article("X")));
    let clock = FakeClock::default();
    ContentExtractor::new(clock.clone()).extract(&page).await;
    assert_eq!(page.scrolls(), 2);
    assert_eq!(clock.elapsed(), Duration::from_millis(500));

    let quiet = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_container("article", &article("X")));
    ContentExtractor::new(FakeClock::default())
        .with_scroll_probe(false)
        .extract(&quiet)
        .await;
    assert_eq!(quiet.scrolls(), 0);
}

// ----- discovery -----------------------------------------------------------

#[tokio::test]
async fn discovery_skips_hidden_and_duplicate_elements() {
    let doc = FakeDocument::new(URL)
        .with_link("Home", "/")
        .with_link("HOME", "/index")
        .with_element(FakeElement::link("Secret", "/s").hidden())
        .with_element(FakeElement::link("", "/icon"))
        .with_element(FakeElement::button("Subscribe"));
    let page = FakePage::new(vec![]).showing(doc);

    let registry = discover(&page, 5).await.unwrap();
    let names: Vec<&str> = registry
        .entries()
        .iter()
        .map(|e| e.descriptor.identifier())
        .collect();
    assert_eq!(names, vec!["Home", "Subscribe"]);
    assert!(registry.entries().iter().all(|e| e.hint.is_some()));
}

#[tokio::test]
async fn discovery_fails_only_when_the_page_is_gone() {
    assert!(discover(&FakePage::broken(), 5).await.is_err());
    let empty = FakePage::new(vec![]).showing(FakeDocument::new(URL));
    assert!(discover(&empty, 5).await.unwrap().is_empty());
}

// ----- resolver ------------------------------------------------------------

fn descriptor(text: &str, tag: &str, href: Option<&str>, path: &str) -> ElementDescriptor {
    ElementDescriptor {
        text: text.into(),
        label: String::new(),
        tag: tag.into(),
        href: href.map(str::to_string),
        path: path.into(),
    }
}

#[tokio::test]
async fn live_handle_is_clicked_directly() {
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_link("News", "https://site.test/news"));
    let handle = page.handle(0);
    let resolver = ElementResolver::new(FakeClock::default());

    let outcome = resolver
        .resolve_and_click(&page, &descriptor("News", "a", Some("https://site.test/news"), ""), Some(&handle), 0)
        .await;
    assert!(outcome.clicked);
    assert_eq!(outcome.method, Some(ClickMethod::Direct));
    assert_eq!(page.url(), "https://site.test/news");
}

#[tokio::test]
async fn intercepted_click_falls_back_to_script_click() {
    let mut link = FakeElement::link("News", "https://site.test/news");
    link.click_fails = true;
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_element(link));
    let handle = page.handle(0);

    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("News", "a", None, ""), Some(&handle), 0)
        .await;
    assert_eq!(outcome.method, Some(ClickMethod::Script));
    assert_eq!(page.script_clicks(), vec!["News".to_string()]);
}

#[tokio::test]
async fn stale_handle_is_re_found_by_text() {
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_link("News", "https://site.test/news"));
    let stale = page.handle(0);
    page.rerender();

    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("News", "a", None, ""), Some(&stale), 0)
        .await;
    assert_eq!(outcome.method, Some(ClickMethod::TextMatch));
}

#[tokio::test]
async fn relabelled_link_is_re_found_by_href() {
    let mut link = FakeElement::link("Latest news", "/news");
    link.selectors.push("a[href=\"/news\"]".into());
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_element(link));
    let stale = page.handle(0);
    page.rerender();

    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("News", "a", Some("/news"), ""), Some(&stale), 0)
        .await;
    assert_eq!(outcome.method, Some(ClickMethod::Href));
}

#[tokio::test]
async fn saved_path_rescues_a_stale_unmatched_element() {
    let path = "/html[1]/body[1]/div[2]/a[1]";
    let page = FakePage::new(vec![]).showing(
        FakeDocument::new(URL)
            .with_element(FakeElement::link("Renamed", "/other").with_path(path)),
    );
    let stale = page.handle(0);
    page.rerender();

    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("Original", "a", None, path), Some(&stale), 0)
        .await;
    assert!(outcome.clicked);
    assert_eq!(outcome.method, Some(ClickMethod::Path));
    assert_eq!(page.clicks(), vec!["Renamed".to_string()]);
}

#[tokio::test]
async fn refreshed_list_is_the_last_resort() {
    let page = FakePage::new(vec![]).showing(
        FakeDocument::new(URL)
            .with_element(FakeElement::button("First"))
            .with_element(FakeElement::button("Second")),
    );

    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("", "span", None, "/gone"), None, 1)
        .await;
    assert_eq!(outcome.method, Some(ClickMethod::Refreshed));
    assert_eq!(page.clicks(), vec!["Second".to_string()]);
}

#[tokio::test]
async fn every_strategy_failing_reports_no_click() {
    let page = FakePage::new(vec![]).showing(
        FakeDocument::new(URL).with_element(FakeElement::button("Stuck").unclickable()),
    );
    let handle = page.handle(0);
    let outcome = ElementResolver::new(FakeClock::default())
        .resolve_and_click(&page, &descriptor("Stuck", "button", None, ""), Some(&handle), 0)
        .await;
    assert!(!outcome.clicked);
    assert_eq!(outcome.method, None);
}

#[tokio::test]
async fn suggested_selector_waits_then_gives_up() {
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL));
    let clock = FakeClock::default();
    let outcome = ElementResolver::new(clock.clone())
        .click_selector(&page, "#missing", Duration::from_secs(10))
        .await;
    assert!(!outcome.clicked);
    assert!(clock.elapsed() >= Duration::from_secs(10));
    assert!(clock.elapsed() < Duration::from_secs(11));
}

// ----- convergence ---------------------------------------------------------

fn detector(clock: &FakeClock) -> ConvergenceDetector<FakeClock> {
    ConvergenceDetector::new(clock.clone(), ConvergenceOptions::default())
}

#[tokio::test]
async fn navigation_is_seen_as_a_url_change() {
    let page = FakePage::new(vec![FakeDocument::new("https://site.test/next")])
        .showing(FakeDocument::new(URL).with_link("Next", "https://site.test/next"));
    let baseline = page.snapshot().await.unwrap();
    page.click(&page.handle(0)).await.unwrap();

    let clock = FakeClock::default();
    let settled = detector(&clock).await_settled(&page, &baseline).await;
    assert_eq!(settled, Settled::UrlChanged("https://site.test/next".into()));
    assert_eq!(clock.elapsed(), Duration::ZERO);
}

#[tokio::test]
async fn new_window_takes_focus() {
    let popup = FakeDocument::new("https://popup.test/");
    let page = FakePage::new(vec![popup]).showing(
        FakeDocument::new(URL).with_element(
            FakeElement::link("Open", "https://popup.test/")
                .with_effect(ClickEffect::OpenWindow("https://popup.test/".into())),
        ),
    );
    let baseline = page.snapshot().await.unwrap();
    page.click(&page.handle(0)).await.unwrap();

    let settled = detector(&FakeClock::default()).await_settled(&page, &baseline).await;
    assert_eq!(settled, Settled::NewWindow);
    assert_eq!(page.url(), "https://popup.test/");
}

#[tokio::test]
async fn in_place_update_is_seen_as_a_dom_change() {
    let updated = FakeDocument::new(URL).with_text("Loaded 20 more items");
    let page = FakePage::new(vec![]).showing(
        FakeDocument::new(URL)
            .with_element(FakeElement::button("More").with_effect(ClickEffect::Rerender(updated))),
    );
    let baseline = page.snapshot().await.unwrap();
    page.click(&page.handle(0)).await.unwrap();

    let clock = FakeClock::default();
    let settled = detector(&clock).await_settled(&page, &baseline).await;
    assert_eq!(settled, Settled::DomChanged(ChangeSignal::Text));
    assert!(settled.changed());
    assert!(clock.elapsed() >= Duration::from_secs(3));
}

#[tokio::test]
async fn quiet_page_is_unchanged_after_a_bounded_wait() {
    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL).with_element(FakeElement::button("Noop")));
    let baseline = page.snapshot().await.unwrap();
    page.click(&page.handle(0)).await.unwrap();

    let clock = FakeClock::default();
    let options = ConvergenceOptions::default();
    let settled = ConvergenceDetector::new(clock.clone(), options.clone())
        .await_settled(&page, &baseline)
        .await;
    assert_eq!(settled, Settled::Unchanged);
    assert!(!settled.changed());

    let budget = options.url_change_timeout + options.settle_timeout;
    assert!(clock.elapsed() >= budget);
    assert!(clock.elapsed() <= budget + 2 * options.poll_interval);
    assert!(page.scrolls() > 0);
}

#[tokio::test]
async fn ready_wait_is_bounded() {
    let clock = FakeClock::default();
    let ready = detector(&clock)
        .await_ready(&FakePage::broken(), Duration::from_secs(10))
        .await;
    assert!(!ready);
    assert!(clock.elapsed() >= Duration::from_secs(10));

    let page = FakePage::new(vec![]).showing(FakeDocument::new(URL));
    assert!(detector(&FakeClock::default()).await_ready(&page, Duration::from_secs(10)).await);
}
