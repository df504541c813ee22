// Askama template definitions

use askama::Template;

use crate::auth::{Session, SessionUser};
use crate::catalog::Product;

/// Card view of one catalog entry: field selection only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: Option<String>,
    pub href: String,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            description: product.description.clone().filter(|d| !d.is_empty()),
            image: product.images.first().cloned(),
            price: product.price().and_then(|p| p.display_amount()),
            href: format!("/products/{}", product.id),
        }
    }
}

/// Map catalog entries to cards, one per product, provider order kept.
pub fn product_cards(products: &[Product]) -> Vec<ProductCard> {
    products.iter().map(ProductCard::from).collect()
}

fn session_user(session: Option<&Session>) -> Option<SessionUser> {
    session.map(|s| s.user.clone())
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub user: Option<SessionUser>,
    pub cards: Vec<ProductCard>,
}

impl IndexTemplate {
    pub fn new(session: Option<&Session>, products: &[Product]) -> Self {
        Self {
            user: session_user(session),
            cards: product_cards(products),
        }
    }
}

#[derive(Template)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub user: Option<SessionUser>,
    pub card: ProductCard,
}

impl ProductTemplate {
    pub fn new(session: Option<&Session>, product: &Product) -> Self {
        Self {
            user: session_user(session),
            card: ProductCard::from(product),
        }
    }
}

#[derive(Template)]
#[template(path = "signin.html")]
pub struct SignInTemplate {
    pub user: Option<SessionUser>,
    pub action: String,
    pub callback_url: String,
    pub failed: bool,
}

#[derive(Template)]
#[template(path = "account.html")]
pub struct AccountTemplate {
    pub user: Option<SessionUser>,
    pub account: SessionUser,
    pub expires: String,
}

impl AccountTemplate {
    pub fn new(session: Session) -> Self {
        Self {
            user: Some(session.user.clone()),
            account: session.user,
            expires: session.expires,
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub user: Option<SessionUser>,
    pub title: String,
    pub message: String,
}
