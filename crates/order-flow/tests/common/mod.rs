//! Fixture storefront and a fake launcher that serves it.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cartpilot_core_types::{LineItem, OrderRequest, OrderSnapshot, OrderStatus};
use cdp_adapter::fixture::{FixturePage, FixtureSite, FixtureTarget};
use cdp_adapter::{AdapterError, AdapterErrorKind, CookieInfo, Page};
use order_flow::{EngineConfig, OrderEngine};
use parking_lot::Mutex;
use session_manager::{BrowserLauncher, LaunchedBrowser, SessionManager};
use tempfile::TempDir;

pub const LANDING: &str = "https://shop.test/";
pub const LOGIN_OTP: &str = "4321";
pub const PAYMENT_OTP: &str = "987654";

pub fn product_url(slug: &str) -> String {
    format!("https://shop.test/pn/{slug}")
}

#[derive(Clone, Debug)]
pub struct Product {
    /// Rendered as the page heading; `None` leaves the page without a title
    pub title: Option<String>,
    pub in_stock: bool,
    /// An in-stock product whose add button never renders
    pub broken_add: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoginStep {
    Idle,
    Phone,
    Otp,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStage {
    Closed,
    Methods,
    CashSelected,
    Otp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlacedOrder {
    pub items: Vec<(String, u32)>,
    pub address: Option<String>,
    pub payment: &'static str,
}

/// Server-side state of the fake shop, shared by every page it serves.
#[derive(Debug)]
pub struct Shop {
    pub logged_in: bool,
    pub login_step: LoginStep,
    pub phone: Option<String>,
    pub otp_digits: String,
    pub overlay: bool,
    pub products: BTreeMap<String, Product>,
    pub cart: Vec<(String, u32)>,
    pub addresses: Vec<String>,
    pub picker_open: bool,
    pub selected_address: Option<String>,
    pub cart_open: bool,
    pub stored_balance: bool,
    pub payment_otp_required: bool,
    pub payment_stage: PaymentStage,
    pub payment_otp: Option<String>,
    pub placed: Vec<PlacedOrder>,
    /// Quantity-increase clicks that land on a detached button before one goes through
    pub detached_increase_clicks: usize,
}

impl Default for Shop {
    fn default() -> Self {
        Self {
            logged_in: true,
            login_step: LoginStep::Idle,
            phone: None,
            otp_digits: String::new(),
            overlay: false,
            products: BTreeMap::new(),
            cart: Vec::new(),
            addresses: vec!["Home".into(), "Office New Cafe".into()],
            picker_open: false,
            selected_address: None,
            cart_open: false,
            stored_balance: true,
            payment_otp_required: false,
            payment_stage: PaymentStage::Closed,
            payment_otp: None,
            placed: Vec::new(),
            detached_increase_clicks: 0,
        }
    }
}

impl Shop {
    pub fn with_product(mut self, slug: &str, title: &str, in_stock: bool) -> Self {
        self.products.insert(
            product_url(slug),
            Product {
                title: Some(title.into()),
                in_stock,
                broken_add: false,
            },
        );
        self
    }

    fn cart_count(&self) -> u32 {
        self.cart.iter().map(|(_, qty)| qty).sum()
    }

    fn quantity_of(&self, url: &str) -> u32 {
        self.cart
            .iter()
            .find(|(entry, _)| entry == url)
            .map(|(_, qty)| *qty)
            .unwrap_or(0)
    }

    fn place(&mut self, payment: &'static str) {
        self.placed.push(PlacedOrder {
            items: std::mem::take(&mut self.cart),
            address: self.selected_address.clone(),
            payment,
        });
        self.cart_open = false;
        self.payment_stage = PaymentStage::Closed;
    }

    fn render_body(&self, url: &str) -> String {
        let mut html = String::new();
        html.push_str("<header>");
        if self.cart_count() > 0 {
            html.push_str(&format!(
                r#"<span data-testid="cart-items-number">{}</span>"#,
                self.cart_count()
            ));
        }
        html.push_str(r#"<button data-testid="cart-btn">Cart</button>"#);
        html.push_str(r#"<div data-testid="address-header">Deliver to</div>"#);
        if !self.logged_in {
            html.push_str(r#"<span data-testid="login-btn">Login</span>"#);
        }
        html.push_str("</header>");

        if self.overlay {
            html.push_str(r#"<div class="promo"><p>Free delivery today</p><button>Close</button></div>"#);
        }

        match self.login_step {
            LoginStep::Phone => html.push_str(
                r#"<div class="login"><input placeholder="Enter Phone Number"><button>Continue</button></div>"#,
            ),
            LoginStep::Otp => {
                html.push_str(r#"<div class="login">"#);
                for _ in 0..LOGIN_OTP.len() {
                    html.push_str(r#"<input inputmode="numeric" maxlength="1">"#);
                }
                html.push_str("</div>");
            }
            LoginStep::Idle => {}
        }

        if self.picker_open {
            html.push_str(r#"<div data-testid="saved-address-container">"#);
            for label in &self.addresses {
                html.push_str(&format!(
                    r#"<div class="c4ZmYS" data-label="{label}"><h4>{label}</h4><p>Street</p></div>"#
                ));
            }
            html.push_str("</div>");
        }

        if let Some(product) = self.products.get(url) {
            html.push_str("<main>");
            if let Some(title) = &product.title {
                html.push_str(&format!("<h1>{title}</h1>"));
            }
            if !product.in_stock {
                html.push_str(r#"<button aria-label="Notify Me">Notify Me</button>"#);
            } else if self.quantity_of(url) > 0 {
                html.push_str(&format!(
                    r#"<div><span>{}</span><button aria-label="Increase quantity by one">+</button></div>"#,
                    self.quantity_of(url)
                ));
            } else if !product.broken_add {
                html.push_str(r#"<button class="WJXJe">Add To Cart</button>"#);
            } else {
                html.push_str("<p>Add to cart unavailable right now</p>");
            }
            html.push_str("</main>");
        }

        if self.cart_open {
            html.push_str(r#"<aside><header class="zMuMp"><button class="cpG2SV" aria-label="Back button">Back</button></header>"#);
            for (entry_url, qty) in &self.cart {
                html.push_str(&format!(
                    r#"<div class="__6RuoF" data-url="{entry_url}"><p data-testid="undefined-cart-qty">{qty}</p><button aria-label="Remove">-</button></div>"#
                ));
            }
            if !self.cart.is_empty() {
                match self.payment_stage {
                    PaymentStage::Closed if self.stored_balance => html.push_str(
                        r#"<button class="my-2 bg-skin-primary"><span>Place Order</span></button>"#,
                    ),
                    PaymentStage::Closed => html.push_str(
                        r#"<button class="my-2 bg-skin-primary"><span>Click to Pay</span></button>"#,
                    ),
                    PaymentStage::Methods => {
                        html.push_str(r#"<div testid="nvb_cod">Pay on Delivery</div>"#)
                    }
                    PaymentStage::CashSelected => {
                        html.push_str(r#"<button>Proceed to Pay</button>"#)
                    }
                    PaymentStage::Otp => html.push_str(
                        r#"<input type="password" name="otpValue"><button id="submitBtn">Submit</button>"#,
                    ),
                }
            }
            html.push_str("</aside>");
        }
        html
    }

    fn click(&mut self, url: &str, target: &FixtureTarget) {
        let aria = target.attr("aria-label").unwrap_or_default();
        let testid = target.closest_attr("data-testid").unwrap_or_default();
        let class = target.attr("class").unwrap_or_default();
        let text = target.text.as_str();

        if testid == "login-btn" {
            self.login_step = LoginStep::Phone;
        } else if text == "Continue" && self.phone.is_some() {
            self.login_step = LoginStep::Otp;
        } else if text == "Close" {
            self.overlay = false;
        } else if class.contains("WJXJe") {
            if self.products.get(url).map(|p| p.in_stock).unwrap_or(false) {
                self.cart.push((url.to_string(), 1));
            }
        } else if aria == "Increase quantity by one" {
            if let Some(entry) = self.cart.iter_mut().find(|(entry, _)| entry == url) {
                entry.1 += 1;
            }
        } else if testid == "cart-btn" {
            self.cart_open = true;
        } else if aria == "Back button" {
            self.cart_open = false;
        } else if aria == "Remove" {
            if let Some(entry_url) = target.closest_attr("data-url") {
                if let Some(pos) = self.cart.iter().position(|(entry, _)| entry == entry_url) {
                    self.cart[pos].1 -= 1;
                    if self.cart[pos].1 == 0 {
                        self.cart.remove(pos);
                    }
                }
            }
        } else if testid == "address-header" {
            self.picker_open = true;
        } else if let Some(label) = target.closest_attr("data-label") {
            self.selected_address = Some(label.to_string());
            self.picker_open = false;
        } else if text.contains("Place Order") {
            self.place("stored_balance");
        } else if text.contains("Click to Pay") {
            self.payment_stage = PaymentStage::Methods;
        } else if target.attr("testid") == Some("nvb_cod") {
            self.payment_stage = PaymentStage::CashSelected;
        } else if text == "Proceed to Pay" {
            if self.payment_otp_required {
                self.payment_stage = PaymentStage::Otp;
            } else {
                self.place("pay_on_delivery");
            }
        } else if target.attr("id") == Some("submitBtn") {
            if self.payment_otp.as_deref() == Some(PAYMENT_OTP) {
                self.place("pay_on_delivery");
            }
        }
    }

    fn fill(&mut self, target: &FixtureTarget, value: &str) {
        if target.attr("placeholder") == Some("Enter Phone Number") {
            self.phone = Some(value.to_string());
        } else if target.attr("maxlength") == Some("1") {
            self.otp_digits.push_str(value);
            if self.otp_digits.len() == LOGIN_OTP.len() {
                if self.otp_digits == LOGIN_OTP {
                    self.logged_in = true;
                    self.login_step = LoginStep::Idle;
                }
                self.otp_digits.clear();
            }
        } else if target.attr("name") == Some("otpValue") {
            self.payment_otp = Some(value.to_string());
        }
    }
}

/// Storefront backed by the shared [`Shop`].
pub struct Storefront {
    pub shop: Arc<Mutex<Shop>>,
}

impl FixtureSite for Storefront {
    fn render(&self, url: &str) -> String {
        format!("<html><body>{}</body></html>", self.shop.lock().render_body(url))
    }

    fn on_click(&mut self, url: &str, target: &FixtureTarget) -> Option<String> {
        self.shop.lock().click(url, target);
        None
    }

    fn on_fill(&mut self, _url: &str, target: &FixtureTarget, value: &str) {
        self.shop.lock().fill(target, value);
    }

    fn interaction_fault(&mut self, target: &FixtureTarget) -> Option<AdapterError> {
        let mut shop = self.shop.lock();
        if target.attr("aria-label") != Some("Increase quantity by one") || shop.detached_increase_clicks == 0 {
            return None;
        }
        shop.detached_increase_clicks -= 1;
        Some(
            AdapterError::new(AdapterErrorKind::StaleElement)
                .with_hint("button was detached by a re-render")
                .retriable(true),
        )
    }

    fn on_navigate(&mut self, _url: &str) {
        let mut shop = self.shop.lock();
        shop.cart_open = false;
        shop.picker_open = false;
        shop.payment_stage = PaymentStage::Closed;
    }

    fn cookies(&self) -> Vec<CookieInfo> {
        if self.shop.lock().logged_in {
            vec![CookieInfo::new("session", "s3cr3t", ".shop.test")]
        } else {
            Vec::new()
        }
    }
}

pub fn storefront_page(shop: &Arc<Mutex<Shop>>, url: &str) -> FixturePage<Storefront> {
    FixturePage::new(
        Storefront {
            shop: Arc::clone(shop),
        },
        url,
    )
}

#[derive(Default)]
pub struct Counters {
    pub launches: AtomicUsize,
    pub closes: AtomicUsize,
}

impl Counters {
    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

struct ShopBrowser {
    page: Arc<FixturePage<Storefront>>,
    counters: Arc<Counters>,
}

#[async_trait]
impl LaunchedBrowser for ShopBrowser {
    fn page(&self) -> Arc<dyn Page> {
        Arc::clone(&self.page) as Arc<dyn Page>
    }

    async fn close(self: Box<Self>) -> Result<(), AdapterError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Serves the shop; the first `locked_launches` launches fail with a locked profile.
pub struct ShopLauncher {
    shop: Arc<Mutex<Shop>>,
    counters: Arc<Counters>,
    locked_launches: AtomicUsize,
}

#[async_trait]
impl BrowserLauncher for ShopLauncher {
    async fn launch(&self, _profile_dir: &Path) -> Result<Box<dyn LaunchedBrowser>, AdapterError> {
        self.counters.launches.fetch_add(1, Ordering::SeqCst);
        let locked = self
            .locked_launches
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if locked {
            return Err(AdapterError::new(AdapterErrorKind::LaunchFailed)
                .with_hint("profile directory is locked by another process"));
        }
        Ok(Box::new(ShopBrowser {
            page: Arc::new(storefront_page(&self.shop, "about:blank")),
            counters: Arc::clone(&self.counters),
        }))
    }
}

pub fn test_config() -> EngineConfig {
    EngineConfig {
        landing_url: LANDING.to_string(),
        session_domain: Some("shop.test".to_string()),
        login_timeout: Duration::from_secs(5),
        payment_timeout: Duration::from_secs(5),
        poll_interval: Duration::from_millis(5),
        element_wait: Duration::from_millis(60),
        ..EngineConfig::default()
    }
}

pub struct Harness {
    pub engine: OrderEngine,
    pub shop: Arc<Mutex<Shop>>,
    pub counters: Arc<Counters>,
    pub profile: TempDir,
}

impl Harness {
    pub fn new(shop: Shop) -> Self {
        Self::build(shop, test_config(), 0)
    }

    pub fn build(shop: Shop, config: EngineConfig, locked_launches: usize) -> Self {
        let shop = Arc::new(Mutex::new(shop));
        let counters = Arc::new(Counters::default());
        let launcher = ShopLauncher {
            shop: Arc::clone(&shop),
            counters: Arc::clone(&counters),
            locked_launches: AtomicUsize::new(locked_launches),
        };
        let profile = tempfile::tempdir().expect("tempdir");
        let profile_dir = profile.path().join("profile");
        std::fs::create_dir_all(&profile_dir).expect("profile dir");
        let sessions = SessionManager::new(Arc::new(launcher), profile_dir);
        Self {
            engine: OrderEngine::new(sessions, config),
            shop,
            counters,
            profile,
        }
    }

    /// Poll the engine until it reports `status`.
    pub async fn wait_for(&self, status: OrderStatus) -> OrderSnapshot {
        for _ in 0..1000 {
            let snapshot = self.engine.status();
            if snapshot.status == status {
                return snapshot;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!(
            "engine never reached {status}; last snapshot {:?}",
            self.engine.status()
        );
    }
}

pub fn request(items: &[(&str, u32)]) -> OrderRequest {
    OrderRequest::new(
        items
            .iter()
            .map(|(slug, qty)| LineItem::new(product_url(slug), *qty))
            .collect(),
        "9876543210",
        "Home",
    )
    .expect("valid request")
}
