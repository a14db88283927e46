//! Application context shared by every command.
//!
//! [`Storefront`] owns the cart controller, the catalog resolver and the
//! resolved session. It is built once per process by [`Storefront::start`],
//! which waits for the session gate before returning.

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument};

use easykart_core::{Cart, ProductId, Quantity};

use crate::cart::{CartController, StagedEdits};
use crate::catalog::{CartView, CatalogClient, CatalogError, CatalogLookup, LineResolver, ProductRecord};
use crate::config::StorefrontConfig;
use crate::error::{AppError, Result, add_breadcrumb, clear_sentry_user};
use crate::session::{IdentityClient, IdentityLookup, Session};
use crate::store::{CartStore, FileStore, KeyValueStore, StoreError, TokenStore};

/// Cart, catalog and session for one client process.
pub struct Storefront<C = CatalogClient> {
    controller: CartController,
    resolver: LineResolver<C>,
    tokens: TokenStore,
    session: Session,
}

impl Storefront<CatalogClient> {
    /// Open the data directory, resolve the session and load the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened or the HTTP
    /// clients cannot be built. Identity failures are not errors.
    pub async fn start(config: &StorefrontConfig) -> Result<Self> {
        let backend: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
        let catalog = CatalogClient::new(config)?;
        let identity = IdentityClient::new(config)?;
        Ok(Self::assemble(backend, catalog, &identity).await)
    }
}

impl<C: CatalogLookup> Storefront<C> {
    /// Build a storefront over explicit collaborators.
    ///
    /// The session is resolved before the cart is loaded.
    pub async fn assemble<I: IdentityLookup>(
        backend: Arc<dyn KeyValueStore>,
        catalog: C,
        identity: &I,
    ) -> Self {
        let tokens = TokenStore::new(Arc::clone(&backend));
        let session = Session::resolve(&tokens, identity).await;
        let controller = CartController::load(CartStore::new(backend));

        Self {
            controller,
            resolver: LineResolver::new(catalog),
            tokens,
            session,
        }
    }

    /// The authoritative cart.
    #[must_use]
    pub const fn cart(&self) -> &Cart {
        self.controller.cart()
    }

    /// Item count for the navigation badge.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.controller.total_count()
    }

    /// The resolved session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Open a staged edit buffer over the current cart.
    #[must_use]
    pub fn staged_edits(&self) -> StagedEdits {
        StagedEdits::open(&self.controller)
    }

    /// Fetch one product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the lookup fails.
    pub async fn product(&self, id: &ProductId) -> std::result::Result<ProductRecord, CatalogError> {
        self.resolver.catalog().fetch_product(id).await
    }

    /// Fetch the product list.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError` if the lookup fails.
    pub async fn products(&self) -> std::result::Result<Vec<ProductRecord>, CatalogError> {
        self.resolver.catalog().list_products().await
    }

    /// Look up a product and add `delta` units of it to the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Catalog` if the product cannot be fetched; the cart
    /// is left unchanged in that case.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn add_product(&mut self, id: ProductId, delta: Quantity) -> Result<ProductRecord> {
        let record = self.product(&id).await?;
        add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())][..]));
        self.controller.add_quantity(id, delta);
        Ok(record)
    }

    /// Remove a product line. Removing an absent product is a no-op.
    pub fn remove_line(&mut self, id: &ProductId) -> bool {
        if !self.controller.cart().contains(id) {
            return false;
        }
        add_breadcrumb("cart", "Removed product", Some(&[("product_id", id.as_str())][..]));
        self.controller.remove_line(id);
        true
    }

    /// Empty the cart.
    pub fn clear_cart(&mut self) {
        self.controller.clear();
    }

    /// Stage raw quantity edits and commit them as one cart replacement.
    ///
    /// Edits whose value does not parse are skipped. Returns the number of
    /// edits that were accepted.
    ///
    /// # Errors
    ///
    /// Returns `AppError::StagedEdit` if the accepted edits leave the cart
    /// unchanged.
    pub fn update_quantities(&mut self, edits: &[(ProductId, String)]) -> Result<usize> {
        let mut staged = self.staged_edits();
        let mut accepted = 0;
        for (id, raw) in edits {
            if staged.set_local_quantity(id, raw) {
                accepted += 1;
            } else {
                tracing::warn!(product_id = %id, value = %raw, "Skipping quantity edit");
            }
        }
        staged.commit(&mut self.controller)?;
        Ok(accepted)
    }

    /// Resolve the cart's product lines and totals.
    ///
    /// Waits for every lookup of the current product set to settle. Lines
    /// whose lookup failed are reported in `failed` and excluded from totals.
    pub async fn cart_view(&self) -> CartView {
        self.resolver.refresh(self.controller.cart()).await
    }

    /// Store a credential token and resolve the session from it.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Store` if the token cannot be persisted.
    pub async fn sign_in<I: IdentityLookup>(
        &mut self,
        token: &SecretString,
        identity: &I,
    ) -> Result<&Session> {
        self.tokens.save(token)?;
        self.session = Session::resolve(&self.tokens, identity).await;
        Ok(&self.session)
    }

    /// Forget the stored token and the session user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the token cannot be deleted.
    pub fn sign_out(&mut self) -> std::result::Result<(), StoreError> {
        self.tokens.clear()?;
        self.session = Session::anonymous();
        clear_sentry_user();
        info!("Signed out");
        Ok(())
    }
}

/// Parse `ID=QTY` pairs for [`Storefront::update_quantities`].
///
/// # Errors
///
/// Returns `AppError::InvalidInput` if a pair has no `=` or an empty id.
pub fn parse_edits(pairs: &[String]) -> Result<Vec<(ProductId, String)>> {
    pairs
        .iter()
        .map(|pair| {
            let (id, raw) = pair
                .split_once('=')
                .ok_or_else(|| AppError::InvalidInput(format!("expected ID=QTY, got '{pair}'")))?;
            let id = id.trim();
            if id.is_empty() {
                return Err(AppError::InvalidInput(format!("missing product id in '{pair}'")));
            }
            Ok((ProductId::from(id), raw.to_string()))
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use secrecy::ExposeSecret;

    use easykart_core::UserId;

    use super::*;
    use crate::cart::StagedEditError;
    use crate::catalog::testing::StaticCatalog;
    use crate::session::{IdentityError, SessionUser};
    use crate::store::{MemoryStore, keys};

    struct AcceptAll;

    impl IdentityLookup for AcceptAll {
        async fn current_user(
            &self,
            token: &SecretString,
        ) -> std::result::Result<SessionUser, IdentityError> {
            if token.expose_secret().is_empty() {
                return Err(IdentityError::Unauthorized);
            }
            Ok(SessionUser {
                id: UserId::new(1),
                full_name: None,
                email: None,
                extra: serde_json::Map::new(),
            })
        }
    }

    async fn storefront(backend: Arc<dyn KeyValueStore>) -> Storefront<StaticCatalog> {
        let catalog = StaticCatalog::with_prices(&[("A", 10), ("B", 5)]).failing("F");
        Storefront::assemble(backend, catalog, &AcceptAll).await
    }

    fn id(s: &str) -> ProductId {
        ProductId::from(s)
    }

    #[tokio::test]
    async fn test_cart_survives_restart() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut first = storefront(Arc::clone(&backend)).await;
        first.add_product(id("A"), Quantity::new(2).unwrap()).await.unwrap();
        first.add_product(id("B"), Quantity::ONE).await.unwrap();
        drop(first);

        let second = storefront(backend).await;
        assert_eq!(second.total_count(), 3);
        assert_eq!(second.cart().quantity(&id("A")), 2);
    }

    #[tokio::test]
    async fn test_add_unknown_product_leaves_cart_unchanged() {
        let mut store = storefront(Arc::new(MemoryStore::new())).await;
        let err = store.add_product(id("Z"), Quantity::ONE).await.unwrap_err();
        assert!(matches!(err, AppError::Catalog(CatalogError::NotFound(_))));
        assert!(store.cart().is_empty());
    }

    #[tokio::test]
    async fn test_cart_view_totals() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set(keys::CART, r#"{"A":2,"B":1,"F":4}"#).unwrap();
        let store = storefront(backend).await;

        let view = store.cart_view().await;
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.failed.len(), 1);
        assert_eq!(view.totals.subtotal.amount, Decimal::from(25));
        assert_eq!(view.totals.total_count, 7);
        // Failed lookups never drop the cart entry
        assert_eq!(store.cart().quantity(&id("F")), 4);
    }

    #[tokio::test]
    async fn test_update_quantities_commits_once() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set(keys::CART, r#"{"A":2,"B":1}"#).unwrap();
        let mut store = storefront(backend).await;

        let edits = parse_edits(&["A=5".to_string(), "B=abc".to_string()]).unwrap();
        let accepted = store.update_quantities(&edits).unwrap();
        assert_eq!(accepted, 1);
        assert_eq!(
            store.cart(),
            &Cart::from_quantities([(id("A"), 5), (id("B"), 1)])
        );

        let unchanged = parse_edits(&["A=5".to_string()]).unwrap();
        let err = store.update_quantities(&unchanged).unwrap_err();
        assert!(matches!(
            err,
            AppError::StagedEdit(StagedEditError::NothingToCommit)
        ));
    }

    #[tokio::test]
    async fn test_remove_line() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        backend.set(keys::CART, r#"{"A":1}"#).unwrap();
        let mut store = storefront(Arc::clone(&backend)).await;

        assert!(store.remove_line(&id("A")));
        assert!(!store.remove_line(&id("A")));
        assert_eq!(backend.get(keys::CART).unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_sign_in_and_out() {
        let backend: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut store = storefront(Arc::clone(&backend)).await;
        assert!(!store.session().is_authenticated());

        let session = store
            .sign_in(&SecretString::from("t0ken"), &AcceptAll)
            .await
            .unwrap();
        assert!(session.is_authenticated());
        assert_eq!(backend.get(keys::TOKEN).unwrap().as_deref(), Some("t0ken"));

        // A restart resolves the same user from the stored token
        let restarted = storefront(Arc::clone(&backend)).await;
        assert!(restarted.session().is_authenticated());

        store.sign_out().unwrap();
        assert!(!store.session().is_authenticated());
        assert_eq!(backend.get(keys::TOKEN).unwrap(), None);
    }

    #[test]
    fn test_parse_edits() {
        let edits = parse_edits(&["7=3".to_string(), " 8 = x".to_string()]).unwrap();
        assert_eq!(edits, vec![(id("7"), "3".to_string()), (id("8"), " x".to_string())]);

        assert!(parse_edits(&["7".to_string()]).is_err());
        assert!(parse_edits(&["=3".to_string()]).is_err());
    }
}
