//! Default strategy lists for the storefront
//!
//! Each list is ordered by priority. Markup-specific selectors come first, followed by
//! progressively more generic fallbacks (ARIA labels, visible text, page text).

use std::collections::HashMap;

use crate::strategies::{Finder, Recipe, Strategy, TextMatch};
use crate::types::{ActionKey, Collection, Outcome, Probe};

/// Ordered strategy lists for every action, probe and collection
#[derive(Debug, Clone)]
pub struct StrategySet {
    actions: HashMap<ActionKey, Vec<Strategy>>,
    probes: HashMap<Probe, Vec<Strategy>>,
    collections: HashMap<Collection, Vec<Strategy>>,
}

impl StrategySet {
    /// Empty set; every action exhausts immediately
    pub fn empty() -> Self {
        Self {
            actions: HashMap::new(),
            probes: HashMap::new(),
            collections: HashMap::new(),
        }
    }

    /// Strategies for the supported storefront markup
    pub fn standard() -> Self {
        let mut set = Self::empty();
        for key in ALL_ACTIONS {
            set.actions.insert(key, standard_action(key));
        }
        for probe in [Probe::ProductTitle, Probe::CartBadgeCount, Probe::EntryQuantity] {
            set.probes.insert(probe, standard_probe(probe));
        }
        set.collections
            .insert(Collection::CartEntries, standard_collection(Collection::CartEntries));
        set
    }

    /// Replace the list for one action
    pub fn with_action(mut self, key: ActionKey, strategies: Vec<Strategy>) -> Self {
        self.actions.insert(key, strategies);
        self
    }

    pub fn with_probe(mut self, probe: Probe, strategies: Vec<Strategy>) -> Self {
        self.probes.insert(probe, strategies);
        self
    }

    pub fn with_collection(mut self, collection: Collection, strategies: Vec<Strategy>) -> Self {
        self.collections.insert(collection, strategies);
        self
    }

    pub fn action(&self, key: ActionKey) -> &[Strategy] {
        self.actions.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn probe(&self, probe: Probe) -> &[Strategy] {
        self.probes.get(&probe).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn collection(&self, collection: Collection) -> &[Strategy] {
        self.collections
            .get(&collection)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

impl Default for StrategySet {
    fn default() -> Self {
        Self::standard()
    }
}

const ALL_ACTIONS: [ActionKey; 22] = [
    ActionKey::DetectLoginRequired,
    ActionKey::DetectInStock,
    ActionKey::DetectStoredBalance,
    ActionKey::DetectPaymentOtpChallenge,
    ActionKey::ClickLoginTrigger,
    ActionKey::FillPhoneNumber,
    ActionKey::ClickContinue,
    ActionKey::SubmitLoginOtp,
    ActionKey::SubmitPaymentOtp,
    ActionKey::ClickAddToBasket,
    ActionKey::ClickIncreaseQuantity,
    ActionKey::ClickCheckoutEntry,
    ActionKey::OpenAddressPicker,
    ActionKey::SelectAddress,
    ActionKey::ClickPlaceOrder,
    ActionKey::ClickProceedToPayment,
    ActionKey::SelectPayOnDelivery,
    ActionKey::ClickFinalizePayment,
    ActionKey::ClickConfirmPayment,
    ActionKey::DecrementCartEntry,
    ActionKey::ClickCloseCart,
    ActionKey::DismissOverlay,
];

fn needles(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

fn standard_action(key: ActionKey) -> Vec<Strategy> {
    use Outcome::{Matched, NotMatched};

    match key {
        ActionKey::DetectLoginRequired => vec![
            Strategy::detect("login-button-testid", Finder::css("span[data-testid='login-btn']"), Matched),
            Strategy::detect(
                "login-button-text",
                Finder::with_text("button", TextMatch::equals("Login")),
                Matched,
            ),
            Strategy::detect("login-link-text", Finder::with_text("a", TextMatch::equals("Login")), Matched),
            Strategy::new("session-cookie", Recipe::SessionCookie { on_hit: NotMatched }),
            Strategy::new(
                "auth-storage-key",
                Recipe::StorageKeys {
                    needles: needles(&["auth", "token", "session", "user"]),
                    on_hit: NotMatched,
                },
            ),
            Strategy::detect("account-indicator", Finder::css("[data-testid*='profile'], [data-testid*='account']"), NotMatched),
        ],
        ActionKey::DetectInStock => vec![
            Strategy::detect("notify-me-aria", Finder::css("button[aria-label='Notify Me']"), NotMatched),
            Strategy::detect(
                "notify-me-styled",
                Finder::with_text(
                    "button.SVCWV",
                    TextMatch::ContainsAny(needles(&["notify", "when back in stock"])),
                ),
                NotMatched,
            ),
            Strategy::detect("notify-me-text", Finder::with_text("button", TextMatch::contains("Notify Me")), NotMatched),
            Strategy::detect(
                "notify-aria-partial",
                Finder::attr_contains("button", "aria-label", "notify"),
                NotMatched,
            ),
            Strategy::detect(
                "add-to-cart-styled",
                Finder::with_text("button.WJXJe", TextMatch::ContainsAll(needles(&["add", "cart"]))),
                Matched,
            ),
            Strategy::detect("add-to-cart-text", Finder::with_text("button", TextMatch::equals("Add To Cart")), Matched),
            Strategy::detect("add-to-cart-aria", Finder::css("button[aria-label='Add to Cart']"), Matched),
            Strategy::new(
                "out-of-stock-text",
                Recipe::BodyText {
                    needles: needles(&["out of stock", "notify me", "currently unavailable"]),
                    on_hit: NotMatched,
                },
            ),
            Strategy::new(
                "add-to-cart-body-text",
                Recipe::BodyText {
                    needles: needles(&["add to cart"]),
                    on_hit: Matched,
                },
            ),
        ],
        ActionKey::DetectStoredBalance => vec![
            Strategy::detect(
                "place-order-primary",
                Finder::has_descendant("button.bg-skin-primary", "span", Some(TextMatch::contains("Place Order"))),
                Matched,
            ),
            Strategy::detect(
                "place-order-text",
                Finder::with_text("button[class*='bg-skin-primary']", TextMatch::contains("Place Order")),
                Matched,
            ),
        ],
        ActionKey::DetectPaymentOtpChallenge => vec![
            Strategy::detect("otp-password-field", Finder::css("input[type='password'][name='otpValue']"), Matched),
            Strategy::detect("otp-placeholder", Finder::attr_contains("input", "placeholder", "otp"), Matched),
            Strategy::detect("one-time-code", Finder::css("input[autocomplete='one-time-code']"), Matched),
        ],
        ActionKey::ClickLoginTrigger => vec![
            Strategy::click("login-button-testid", Finder::css("span[data-testid='login-btn']")),
            Strategy::click("login-button-text", Finder::with_text("button", TextMatch::equals("Login"))),
            Strategy::click("login-link-text", Finder::with_text("a", TextMatch::equals("Login"))),
            Strategy::click("login-testid-partial", Finder::attr_contains("[data-testid]", "data-testid", "login")),
        ],
        ActionKey::FillPhoneNumber => vec![
            Strategy::fill("phone-placeholder", Finder::css("input[placeholder='Enter Phone Number']")),
            Strategy::fill("phone-tel-input", Finder::css("input[type='tel']")),
            Strategy::fill("phone-placeholder-partial", Finder::attr_contains("input", "placeholder", "phone")),
        ],
        ActionKey::ClickContinue => vec![
            Strategy::click("continue-text", Finder::with_text("button", TextMatch::contains("Continue"))),
            Strategy::click("send-otp-text", Finder::with_text("button", TextMatch::contains("Send OTP"))),
            Strategy::click("get-otp-text", Finder::with_text("button", TextMatch::contains("Get OTP"))),
        ],
        ActionKey::SubmitLoginOtp => vec![
            Strategy::new(
                "segmented-numeric-boxes",
                Recipe::FillDigits {
                    selector: "input[inputmode='numeric'][maxlength='1']".into(),
                },
            ),
            Strategy::new(
                "segmented-tel-boxes",
                Recipe::FillDigits {
                    selector: "input[type='tel'][maxlength='1']".into(),
                },
            ),
            Strategy::fill("single-numeric-input", Finder::css("input[type='text'][inputmode='numeric']")),
            Strategy::fill("one-time-code-input", Finder::css("input[autocomplete='one-time-code']")),
        ],
        ActionKey::SubmitPaymentOtp => vec![
            Strategy::fill("otp-password-field", Finder::css("input[type='password'][name='otpValue']")),
            Strategy::fill("otp-placeholder", Finder::attr_contains("input", "placeholder", "otp")),
            Strategy::fill("otp-numeric-input", Finder::css("input[inputmode='numeric']")),
        ],
        ActionKey::ClickAddToBasket => vec![
            Strategy::click("add-to-cart-styled", Finder::with_text("button.WJXJe", TextMatch::contains("Add To Cart"))),
            Strategy::click("add-to-cart-aria", Finder::css("button[aria-label='Add to Cart']")),
            Strategy::click("add-to-cart-wrapper", Finder::css("div[aria-label='Add to Cart'] button")),
            Strategy::click("add-to-cart-text", Finder::with_text("button", TextMatch::equals("Add To Cart"))),
        ],
        ActionKey::ClickIncreaseQuantity => vec![
            Strategy::click("increase-aria", Finder::css("button[aria-label='Increase quantity by one']")),
            Strategy::click("add-aria", Finder::css("button[aria-label='Add']")),
            Strategy::click("increase-aria-partial", Finder::attr_contains("button", "aria-label", "increase")),
            Strategy::click("plus-text", Finder::with_text("button", TextMatch::equals("+"))),
        ],
        ActionKey::ClickCheckoutEntry => vec![
            Strategy::click("cart-button-testid", Finder::css("button[data-testid='cart-btn']")),
            Strategy::click("cart-testid-partial", Finder::attr_contains("button", "data-testid", "cart")),
            Strategy::click("cart-aria-partial", Finder::attr_contains("button", "aria-label", "cart")),
        ],
        ActionKey::OpenAddressPicker => vec![
            Strategy::click("address-header", Finder::css("h3[data-testid='user-address']")),
            Strategy::click(
                "add-address-prompt",
                Finder::with_text("button", TextMatch::contains("Add Address to proceed")),
            ),
            Strategy::click("address-header-testid", Finder::css("[data-testid='address-header']")),
        ],
        ActionKey::SelectAddress => vec![
            Strategy::click(
                "saved-address-exact",
                Finder::has_descendant("div.c4ZmYS", "h4, h5, p, span", Some(TextMatch::EqualsParam)),
            ),
            Strategy::click(
                "address-container-exact",
                Finder::has_descendant(
                    "div[data-testid='saved-address-container'] > div",
                    "h4, h5, p, span",
                    Some(TextMatch::EqualsParam),
                ),
            ),
            Strategy::click(
                "saved-address-substring",
                Finder::has_descendant("div.c4ZmYS", "h4, h5, p, span", Some(TextMatch::ContainsParam)),
            )
            .fuzzy(),
            Strategy::click(
                "address-container-substring",
                Finder::has_descendant(
                    "div[data-testid='saved-address-container'] > div",
                    "h4, h5, p, span",
                    Some(TextMatch::ContainsParam),
                ),
            )
            .fuzzy(),
        ],
        ActionKey::ClickPlaceOrder => vec![
            Strategy::click(
                "place-order-primary",
                Finder::has_descendant("button.bg-skin-primary", "span", Some(TextMatch::contains("Place Order"))),
            ),
            Strategy::click(
                "place-order-text",
                Finder::with_text("button[class*='bg-skin-primary']", TextMatch::contains("Place Order")),
            ),
        ],
        ActionKey::ClickProceedToPayment => vec![
            Strategy::click("click-to-pay", Finder::with_text("button", TextMatch::contains("Click to Pay"))),
            Strategy::click("pay-now", Finder::with_text("button", TextMatch::contains("Pay Now"))),
        ],
        ActionKey::SelectPayOnDelivery => vec![
            Strategy::click("cod-testid", Finder::css("div[testid='nvb_cod']")),
            Strategy::click("cod-text", Finder::with_text("div", TextMatch::contains("Pay on Delivery"))),
            Strategy::click("cash-text", Finder::with_text("div", TextMatch::contains("Cash on Delivery"))),
        ],
        ActionKey::ClickFinalizePayment => vec![
            Strategy::click("proceed-to-pay-button", Finder::with_text("button", TextMatch::contains("Proceed to Pay"))),
            Strategy::click("proceed-to-pay-div", Finder::with_text("div", TextMatch::contains("Proceed to Pay"))),
        ],
        ActionKey::ClickConfirmPayment => vec![
            Strategy::click("submit-button-id", Finder::css("button#submitBtn")),
            Strategy::click("confirm-text", Finder::with_text("button", TextMatch::equals("Confirm"))),
            Strategy::click("submit-text", Finder::with_text("button", TextMatch::contains("Submit"))),
            Strategy::click("verify-text", Finder::with_text("button", TextMatch::contains("Verify"))),
        ],
        ActionKey::DecrementCartEntry => vec![
            Strategy::click("remove-aria", Finder::css("button[aria-label='Remove']")),
            Strategy::click("minus-icon", Finder::has_descendant("button", "path[d*='M20 12H4']", None)),
            Strategy::click("remove-aria-partial", Finder::attr_contains("button", "aria-label", "remove")),
            Strategy::click("decrease-aria-partial", Finder::attr_contains("button", "aria-label", "decrease")),
        ],
        ActionKey::ClickCloseCart => vec![
            Strategy::click("header-back", Finder::css("header.zMuMp button.cpG2SV")),
            Strategy::click("drawer-back", Finder::css("div.zzBbh.MwhZN button")),
            Strategy::click("back-aria", Finder::css("button[aria-label='Back button']")),
            Strategy::click("back-aria-partial", Finder::attr_contains("button", "aria-label", "back")),
            Strategy::click(
                "back-chevron-icon",
                Finder::has_descendant("button", "path[d*='M15.5 19L8.5 12L15.5 5']", None),
            ),
            Strategy::click("close-aria-partial", Finder::attr_contains("button", "aria-label", "close")),
        ],
        ActionKey::DismissOverlay => vec![
            Strategy::click("close-text", Finder::with_text("button", TextMatch::equals("Close"))),
            Strategy::click("close-aria", Finder::css("button[aria-label='Close']")),
        ],
    }
}

fn standard_probe(probe: Probe) -> Vec<Strategy> {
    match probe {
        Probe::ProductTitle => vec![
            Strategy::read("heading", Finder::css("h1")),
            Strategy::read("title-testid", Finder::css("[data-testid='product-title']")),
            Strategy::read("title-class", Finder::css(".product-title")),
            Strategy::read("subheading", Finder::css("h2")),
            Strategy::read("minor-heading", Finder::css("h3")),
        ],
        Probe::CartBadgeCount => vec![
            Strategy::read("badge-testid", Finder::css("span[data-testid='cart-items-number']")),
            Strategy::read("badge-testid-partial", Finder::attr_contains("span", "data-testid", "cart-items")),
        ],
        Probe::EntryQuantity => vec![
            Strategy::read("qty-testid", Finder::css("p[data-testid='undefined-cart-qty']")),
            Strategy::read("qty-testid-partial", Finder::attr_contains("[data-testid]", "data-testid", "cart-qty")),
        ],
    }
}

fn standard_collection(collection: Collection) -> Vec<Strategy> {
    match collection {
        Collection::CartEntries => vec![
            Strategy::collect("line-entry-class", Finder::css("div.__6RuoF")),
            Strategy::collect("line-entry-testid", Finder::css("[data-testid='cart-item']")),
        ],
    }
}
