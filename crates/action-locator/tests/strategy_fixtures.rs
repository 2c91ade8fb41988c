//! Strategy lists exercised against fixture markup.

use action_locator::{
    ActionExecutor, ActionKey, AddressMatchPolicy, Collection, Finder, LocatorError, Outcome,
    Probe, SemanticAction, Strategy, StrategySet,
};
use cartpilot_core_types::OtpKind;
use cdp_adapter::fixture::{FixturePage, FixtureSite, FixtureTarget, Interaction};
use cdp_adapter::{CookieInfo, Page};

/// Static markup; clicks and fills are only recorded by the page.
struct StaticSite {
    html: String,
    cookies: Vec<CookieInfo>,
    clicked: Vec<FixtureTarget>,
}

impl FixtureSite for StaticSite {
    fn render(&self, _url: &str) -> String {
        self.html.clone()
    }

    fn on_click(&mut self, _url: &str, target: &FixtureTarget) -> Option<String> {
        self.clicked.push(target.clone());
        None
    }

    fn cookies(&self) -> Vec<CookieInfo> {
        self.cookies.clone()
    }
}

fn page(body: &str) -> FixturePage<StaticSite> {
    page_with_cookies(body, Vec::new())
}

fn page_with_cookies(body: &str, cookies: Vec<CookieInfo>) -> FixturePage<StaticSite> {
    FixturePage::new(
        StaticSite {
            html: format!("<html><body>{body}</body></html>"),
            cookies,
            clicked: Vec::new(),
        },
        "https://shop.test/pn/latte",
    )
}

#[tokio::test]
async fn in_stock_when_add_to_cart_is_visible() {
    let page = page(r#"<h1>Iced Latte</h1><button class="WJXJe">Add To Cart</button>"#);
    let executor = ActionExecutor::default();
    let outcome = executor.perform(&SemanticAction::DetectInStock, &page).await.unwrap();
    assert_eq!(outcome, Outcome::Matched);
    assert_eq!(page.interaction_count(), 0);
}

#[tokio::test]
async fn notify_me_wins_over_add_to_cart() {
    let page = page(
        r#"<button aria-label="Notify Me">Notify Me</button>
           <section><button class="WJXJe">Add To Cart</button></section>"#,
    );
    let outcome = ActionExecutor::default()
        .perform(&SemanticAction::DetectInStock, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotMatched);
}

#[tokio::test]
async fn hidden_notify_button_is_ignored() {
    let page = page(
        r#"<div style="display: none"><button aria-label="Notify Me">Notify Me</button></div>
           <button aria-label="Add to Cart">Add To Cart</button>"#,
    );
    let outcome = ActionExecutor::default()
        .perform(&SemanticAction::DetectInStock, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Matched);
}

#[tokio::test]
async fn ambiguous_stock_signal_fails_safe() {
    let page = page("<h1>Iced Latte</h1><p>Fresh every morning</p>");
    let outcome = ActionExecutor::default()
        .perform(&SemanticAction::DetectInStock, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotMatched);
}

#[tokio::test]
async fn out_of_stock_body_text_is_definitive() {
    let page = page("<h1>Iced Latte</h1><p>Sorry, this item is Out of Stock</p>");
    let outcome = ActionExecutor::default()
        .perform(&SemanticAction::DetectInStock, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::NotMatched);
}

#[tokio::test]
async fn login_detection() {
    let executor = ActionExecutor::default().with_session_domain("shop.test");

    let trigger = page(r#"<span data-testid="login-btn">Login</span>"#);
    assert_eq!(
        executor.perform(&SemanticAction::DetectLoginRequired, &trigger).await.unwrap(),
        Outcome::Matched
    );

    let session = page_with_cookies(
        "<main>Welcome back</main>",
        vec![CookieInfo::new("pref", "1", ".shop.test")],
    );
    assert_eq!(
        executor.perform(&SemanticAction::DetectLoginRequired, &session).await.unwrap(),
        Outcome::NotMatched
    );

    let trigger_and_cookie = page_with_cookies(
        r#"<span data-testid="login-btn">Login</span>"#,
        vec![CookieInfo::new("pref", "1", ".shop.test")],
    );
    assert_eq!(
        executor
            .perform(&SemanticAction::DetectLoginRequired, &trigger_and_cookie)
            .await
            .unwrap(),
        Outcome::Matched
    );

    let unknown = page("<main>Welcome</main>");
    assert_eq!(
        executor.perform(&SemanticAction::DetectLoginRequired, &unknown).await.unwrap(),
        Outcome::Matched
    );
}

#[tokio::test]
async fn interaction_issues_exactly_one_click() {
    // Both the styled button and the aria-labelled one match; only the first strategy acts.
    let page = page(
        r#"<button class="WJXJe">Add To Cart</button>
           <button aria-label="Add to Cart">Add To Cart</button>"#,
    );
    let outcome = ActionExecutor::default()
        .perform(&SemanticAction::ClickAddToBasket, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Matched);
    let interactions = page.interactions();
    assert_eq!(interactions.len(), 1);
    assert_eq!(interactions[0].target().attr("class"), Some("WJXJe"));
}

#[tokio::test]
async fn exhausted_interaction_reports_failure() {
    let page = page("<p>Nothing to click</p>");
    let err = ActionExecutor::default()
        .perform(&SemanticAction::ClickAddToBasket, &page)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LocatorError::StrategiesExhausted {
            action: "click-add-to-basket",
            tried: 4
        }
    ));
    assert_eq!(page.interaction_count(), 0);
}

#[tokio::test]
async fn failing_strategy_falls_through_to_next() {
    let strategies = StrategySet::standard().with_action(
        ActionKey::DismissOverlay,
        vec![
            Strategy::click("broken-selector", Finder::css("button[")),
            Strategy::click("close-text", Finder::css("button.close")),
        ],
    );
    let page = page(r#"<button class="close">Close</button>"#);
    let outcome = ActionExecutor::new(strategies)
        .perform(&SemanticAction::DismissOverlay, &page)
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Matched);
    assert_eq!(page.interaction_count(), 1);
}

const ADDRESSES: &str = r#"
    <div data-testid="saved-address-container">
        <div class="c4ZmYS" data-label="home-2"><h4>Home 2</h4><p>12 Lake Road</p></div>
        <div class="c4ZmYS" data-label="home"><h4>Home</h4><p>4 Hill Street</p></div>
        <div class="c4ZmYS" data-label="office"><h4>Office New Cafe</h4><p>Tech Park</p></div>
    </div>"#;

#[tokio::test]
async fn address_exact_label_beats_earlier_substring() {
    let page = page(ADDRESSES);
    ActionExecutor::default()
        .perform(&SemanticAction::SelectAddress("home".into()), &page)
        .await
        .unwrap();
    assert_eq!(page.interactions()[0].target().attr("data-label"), Some("home"));
}

#[tokio::test]
async fn address_substring_fallback_follows_policy() {
    let lenient = page(ADDRESSES);
    ActionExecutor::default()
        .perform(&SemanticAction::SelectAddress("Office".into()), &lenient)
        .await
        .unwrap();
    assert_eq!(lenient.interactions()[0].target().attr("data-label"), Some("office"));

    let strict = page(ADDRESSES);
    let err = ActionExecutor::default()
        .with_address_policy(AddressMatchPolicy::ExactOnly)
        .perform(&SemanticAction::SelectAddress("Office".into()), &strict)
        .await
        .unwrap_err();
    assert!(matches!(err, LocatorError::StrategiesExhausted { .. }));
    assert_eq!(strict.interaction_count(), 0);
}

#[tokio::test]
async fn segmented_otp_is_filled_digit_by_digit() {
    let boxes = (0..6)
        .map(|_| r#"<input inputmode="numeric" maxlength="1">"#)
        .collect::<String>();
    let page = page(&boxes);
    let action = SemanticAction::SubmitOtpDigits {
        kind: OtpKind::Login,
        code: "482913".into(),
    };
    ActionExecutor::default().perform(&action, &page).await.unwrap();

    let values: Vec<String> = page
        .interactions()
        .into_iter()
        .map(|interaction| match interaction {
            Interaction::Fill { value, .. } => value,
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(values, vec!["4", "8", "2", "9", "1", "3"]);
}

#[tokio::test]
async fn single_otp_input_gets_whole_code() {
    let page = page(r#"<input type="text" inputmode="numeric">"#);
    let action = SemanticAction::SubmitOtpDigits {
        kind: OtpKind::Login,
        code: "4829".into(),
    };
    ActionExecutor::default().perform(&action, &page).await.unwrap();
    match &page.interactions()[..] {
        [Interaction::Fill { value, .. }] => assert_eq!(value, "4829"),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn stored_balance_detection() {
    let wallet = page(r#"<button class="my-2 bg-skin-primary"><span class="text-white">Place Order</span></button>"#);
    let cod = page(r#"<button class="bg-skin-primary"><span>Click to Pay</span></button>"#);
    let executor = ActionExecutor::default();
    assert_eq!(
        executor.perform(&SemanticAction::DetectStoredBalance, &wallet).await.unwrap(),
        Outcome::Matched
    );
    assert_eq!(
        executor.perform(&SemanticAction::DetectStoredBalance, &cod).await.unwrap(),
        Outcome::NotMatched
    );
}

#[tokio::test]
async fn probes_and_collections() {
    let page = page(
        r#"<span data-testid="cart-items-number">3</span>
           <h1>  Iced   Latte </h1>
           <div class="__6RuoF" data-sku="a"><p data-testid="undefined-cart-qty">2</p>
               <button aria-label="Remove">-</button></div>
           <div class="__6RuoF" data-sku="b"><p data-testid="undefined-cart-qty">1</p>
               <button aria-label="Remove">-</button></div>"#,
    );
    let executor = ActionExecutor::default();
    assert_eq!(
        executor.read(Probe::ProductTitle, &page).await.unwrap().as_deref(),
        Some("Iced Latte")
    );
    assert_eq!(
        executor.read(Probe::CartBadgeCount, &page).await.unwrap().as_deref(),
        Some("3")
    );

    let entries = executor.enumerate(Collection::CartEntries, &page).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(
        executor
            .read_scoped(Probe::EntryQuantity, entries[1], &page)
            .await
            .unwrap()
            .as_deref(),
        Some("1")
    );

    executor
        .perform_scoped(&SemanticAction::DecrementCartEntry, entries[1], &page)
        .await
        .unwrap();
    let clicked = page.interactions();
    assert_eq!(clicked.len(), 1);
    assert_eq!(clicked[0].target().closest_attr("data-sku"), Some("b"));
}

#[tokio::test]
async fn empty_page_reads_nothing() {
    let page = page("");
    let executor = ActionExecutor::default();
    assert_eq!(executor.read(Probe::CartBadgeCount, &page).await.unwrap(), None);
    assert!(executor
        .enumerate(Collection::CartEntries, &page)
        .await
        .unwrap()
        .is_empty());
    assert_eq!(page.current_url().await.unwrap(), "https://shop.test/pn/latte");
}
