//! Hand-off of finished designs to the store backend.
//!
//! Every backend mutation runs as a cancellable submission: starting a new
//! one cancels the one in flight, and a cancelled submission reports
//! [`CartError::Superseded`] without touching any state. Failed cart
//! mutations refetch the shopper's cart before returning the error.

use crate::api::{
    CartApi, CartLine, CartLinePayload, CartLineUpdate, Customer, Order, OrderLineItem,
    OrderPayload, OrderTarget, Product, ProductPayload,
};
use crate::config::CartConfig;
use crate::error::{CartError, CartResult};
use crate::pending::PendingSubmission;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tailorink_core::storage::{keys, load_json, save_json};
use tailorink_core::{
    Design, DesignAggregate, DesignEditor, DesignId, DesignState, LocalStore, SurfaceFactory,
    TextProps,
};
use tokio_util::sync::CancellationToken;

/// Result of an add-to-cart request.
#[derive(Debug, Clone, PartialEq)]
pub enum AddOutcome {
    /// The line was created; the editor has been cleared.
    Added(CartLine),
    /// The shopper must sign in first. The submission was stored and will be
    /// replayed by [`CartBridge::recover_pending`].
    RedirectToLogin { return_to: String },
}

/// Where to send the shopper after picking a cart line to edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationIntent {
    pub route: String,
    pub cart_id: String,
    pub design_id: DesignId,
    /// Bring the canvas into view once the route has rendered.
    pub scroll_into_view: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Designs with printable content.
fn valid_designs(state: &DesignState) -> Vec<Design> {
    state.designs.iter().filter(|d| d.has_content()).cloned().collect()
}

/// Cart and order operations for one shopper session.
pub struct CartBridge<A: CartApi> {
    api: Arc<A>,
    store: Arc<dyn LocalStore>,
    config: CartConfig,
    /// Token of the submission currently in flight.
    in_flight: Mutex<Option<CancellationToken>>,
    /// Last known server-side cart.
    lines: Mutex<Vec<CartLine>>,
}

impl<A: CartApi> CartBridge<A> {
    pub fn new(api: Arc<A>, store: Arc<dyn LocalStore>, config: CartConfig) -> Self {
        Self {
            api,
            store,
            config,
            in_flight: Mutex::new(None),
            lines: Mutex::new(Vec::new()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn config(&self) -> &CartConfig {
        &self.config
    }

    /// The cart as of the last refresh or successful mutation.
    pub fn lines(&self) -> Vec<CartLine> {
        lock(&self.lines).clone()
    }

    /// Cancel the submission in flight, if any.
    pub fn cancel_in_flight(&self) {
        if let Some(token) = lock(&self.in_flight).take() {
            token.cancel();
        }
    }

    fn begin(&self) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.in_flight).replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    /// Price of `count` printed sides.
    fn price_for(&self, count: usize) -> CartResult<u64> {
        u64::try_from(count)
            .ok()
            .and_then(|count| count.checked_mul(self.config.unit_price))
            .ok_or(CartError::PriceOverflow)
    }

    /// Run `call` as the current submission.
    async fn run<T>(&self, call: impl Future<Output = CartResult<T>>) -> CartResult<T> {
        let token = self.begin();
        let result = tokio::select! {
            _ = token.cancelled() => Err(CartError::Superseded),
            result = call => result,
        };
        if token.is_cancelled() {
            log::info!("Discarding superseded cart submission");
            return Err(CartError::Superseded);
        }
        result
    }

    /// Build the add-to-cart request body.
    ///
    /// Only designs with a PNG render are submitted, priced per design.
    pub fn prepare_add(
        &self,
        design_state: &DesignState,
        props_state: &TextProps,
        customer: &Customer,
    ) -> CartResult<CartLinePayload> {
        let designs = valid_designs(design_state);
        if designs.is_empty() {
            return Err(CartError::NoValidDesigns);
        }
        Ok(CartLinePayload {
            price: self.price_for(designs.len())?,
            designs,
            design_state: design_state.clone(),
            props_state: props_state.clone(),
            quantity: 1,
            email: customer.email.clone(),
            customer_id: customer.id.clone(),
        })
    }

    /// Send a prepared add-to-cart request.
    pub async fn submit_add(&self, payload: &CartLinePayload) -> CartResult<CartLine> {
        let line = self.run(self.api.create_line(payload)).await?;
        lock(&self.lines).push(line.clone());
        log::info!("Added cart line {} ({} designs)", line.id, payload.designs.len());
        Ok(line)
    }

    /// Clear the editor after a successful submission.
    fn apply_submitted<F: SurfaceFactory>(&self, editor: &mut DesignEditor<F>) -> CartResult<()> {
        editor.clear_all()?;
        Ok(())
    }

    /// Add the editor's designs to the cart.
    ///
    /// Without a signed-in shopper the submission is stored for replay and
    /// a login redirect is returned.
    pub async fn add_design_to_cart<F: SurfaceFactory>(
        &self,
        editor: &mut DesignEditor<F>,
        session: Option<&Customer>,
    ) -> CartResult<AddOutcome> {
        editor.flush();
        let design_state = editor.design_state();
        let props_state = editor.props_state();
        if valid_designs(&design_state).is_empty() {
            return Err(CartError::NoValidDesigns);
        }

        let Some(customer) = session else {
            PendingSubmission {
                design_state,
                props_state,
            }
            .persist(self.store.as_ref())?;
            log::info!("Stored pending cart addition until sign-in");
            return Ok(AddOutcome::RedirectToLogin {
                return_to: self.config.editor_route.clone(),
            });
        };

        let payload = self.prepare_add(&design_state, &props_state, customer)?;
        let line = self.submit_add(&payload).await?;
        self.apply_submitted(editor)?;
        Ok(AddOutcome::Added(line))
    }

    /// Replay a cart addition stored before sign-in.
    ///
    /// The stored submission is removed whether or not the replay
    /// succeeds. Returns `Ok(None)` when nothing was pending.
    pub async fn recover_pending<F: SurfaceFactory>(
        &self,
        editor: &mut DesignEditor<F>,
        customer: &Customer,
    ) -> CartResult<Option<CartLine>> {
        if !PendingSubmission::is_flagged(self.store.as_ref()) {
            return Ok(None);
        }
        let replay = self.replay_pending(customer).await;
        PendingSubmission::clear(self.store.as_ref());

        match replay {
            Ok(line) => {
                self.apply_submitted(editor)?;
                Ok(Some(line))
            }
            Err(e) => {
                log::warn!("Pending cart addition failed: {}", e);
                Err(e)
            }
        }
    }

    async fn replay_pending(&self, customer: &Customer) -> CartResult<CartLine> {
        let pending = PendingSubmission::load(self.store.as_ref())?;
        let payload = self.prepare_add(&pending.design_state, &pending.props_state, customer)?;
        self.submit_add(&payload).await
    }

    /// Submit the addition stored before sign-in if there is one, otherwise
    /// the editor's designs.
    ///
    /// A pending submission does not need any saved editor state.
    pub async fn checkout<F: SurfaceFactory>(
        &self,
        editor: &mut DesignEditor<F>,
        customer: &Customer,
    ) -> CartResult<AddOutcome> {
        if let Some(line) = self.recover_pending(editor, customer).await? {
            return Ok(AddOutcome::Added(line));
        }
        self.add_design_to_cart(editor, Some(customer)).await
    }

    /// Overwrite the cart line being edited with the editor's designs.
    pub async fn update_cart<F: SurfaceFactory>(
        &self,
        editor: &mut DesignEditor<F>,
        customer: &Customer,
    ) -> CartResult<CartLine> {
        let cart_id: String =
            load_json(self.store.as_ref(), keys::CART_ID)?.ok_or(CartError::MissingCartId)?;
        editor.flush();
        let design_state = editor.design_state();
        let update = CartLineUpdate {
            price: self.price_for(valid_designs(&design_state).len())?,
            designs: design_state.designs.clone(),
            design_state,
            props_state: editor.props_state(),
        };

        let line = self
            .reconciling(customer, self.run(self.api.update_line(&cart_id, &update)))
            .await?;
        self.replace_cached(&line);
        self.apply_submitted(editor)?;
        Ok(line)
    }

    pub async fn remove_line(&self, cart_id: &str, customer: &Customer) -> CartResult<()> {
        self.reconciling(customer, self.run(self.api.remove_line(cart_id)))
            .await?;
        lock(&self.lines).retain(|l| l.id != cart_id);
        Ok(())
    }

    /// Change a line's quantity. Quantities outside `1..=max_quantity` are
    /// rejected before any request is made.
    pub async fn set_quantity(
        &self,
        cart_id: &str,
        quantity: u32,
        customer: &Customer,
    ) -> CartResult<CartLine> {
        let max = self.config.max_quantity;
        if !(1..=max).contains(&quantity) {
            return Err(CartError::InvalidQuantity { quantity, max });
        }
        let line = self
            .reconciling(customer, self.run(self.api.set_quantity(cart_id, quantity)))
            .await?;
        self.replace_cached(&line);
        Ok(line)
    }

    pub async fn clear_cart(&self, customer: &Customer) -> CartResult<()> {
        self.reconciling(customer, self.run(self.api.clear_cart(&customer.id)))
            .await?;
        lock(&self.lines).clear();
        Ok(())
    }

    /// Fetch the shopper's cart from the backend.
    pub async fn refresh(&self, customer: &Customer) -> CartResult<Vec<CartLine>> {
        let lines = self.api.list_lines(&customer.id).await?;
        *lock(&self.lines) = lines.clone();
        Ok(lines)
    }

    /// Publish the aggregate's designs as a vendor product.
    pub async fn create_product(
        &self,
        aggregate: &DesignAggregate,
        title: &str,
        vendor_id: &str,
    ) -> CartResult<Product> {
        let designs: Vec<Design> = aggregate.valid_designs().into_iter().cloned().collect();
        if designs.is_empty() {
            return Err(CartError::NoValidDesigns);
        }
        let payload = ProductPayload {
            title: title.to_string(),
            price: self.price_for(designs.len())?,
            images: designs.iter().filter_map(|d| d.png_image.clone()).collect(),
            designs,
            vendor_id: vendor_id.to_string(),
        };
        let product = self.run(self.api.create_product(&payload)).await?;
        log::info!("Created product {}", product.id);
        Ok(product)
    }

    /// Place an order for `lines`.
    pub async fn create_order(
        &self,
        lines: &[CartLine],
        customer: &Customer,
        target: OrderTarget,
    ) -> CartResult<Order> {
        if lines.is_empty() {
            return Err(CartError::EmptyOrder);
        }
        let line_items: Vec<OrderLineItem> = lines
            .iter()
            .map(|line| OrderLineItem {
                cart_id: line.id.clone(),
                quantity: line.quantity,
                price: line.price,
            })
            .collect();
        let subtotal = line_items
            .iter()
            .try_fold(0u64, |total, item| {
                item.price
                    .checked_mul(u64::from(item.quantity))
                    .and_then(|amount| total.checked_add(amount))
            })
            .ok_or(CartError::PriceOverflow)?;
        let payload = OrderPayload {
            line_items,
            subtotal,
            total: subtotal,
            target,
            email: customer.email.clone(),
            customer_id: customer.id.clone(),
        };
        let order = self.run(self.api.create_order(&payload)).await?;
        lock(&self.lines).retain(|l| !lines.iter().any(|ordered| ordered.id == l.id));
        log::info!("Placed order {} ({} lines)", order.id, lines.len());
        Ok(order)
    }

    /// Open a cart line's design in the editor.
    ///
    /// Stores the line's state and id, loads it into the editor, switches to
    /// `design_id` and waits for the editor to settle before returning where
    /// to navigate.
    pub async fn handle_design_click<F: SurfaceFactory>(
        &self,
        editor: &mut DesignEditor<F>,
        line: &CartLine,
        design_id: &str,
    ) -> CartResult<NavigationIntent> {
        let design_state = line.design_state.clone().unwrap_or_else(|| DesignState {
            designs: line.designs.clone(),
            ..DesignState::default()
        });
        let props_state = line.props_state.clone().unwrap_or_default();

        let store = self.store.as_ref();
        save_json(store, keys::SAVED_DESIGN_STATE, &design_state)?;
        save_json(store, keys::SAVED_PROPS_STATE, &props_state)?;
        save_json(store, keys::CART_ID, &line.id)?;

        editor.restore_state();
        editor.switch_design(design_id)?;
        tokio::time::sleep(self.config.settle_delay()).await;

        Ok(NavigationIntent {
            route: self.config.editor_route.clone(),
            cart_id: line.id.clone(),
            design_id: design_id.to_string(),
            scroll_into_view: true,
        })
    }

    /// Await a cart mutation, refetching the cart if it fails.
    async fn reconciling<T>(
        &self,
        customer: &Customer,
        call: impl Future<Output = CartResult<T>>,
    ) -> CartResult<T> {
        match call.await {
            Err(e) if !matches!(e, CartError::Superseded) => {
                log::warn!("Cart mutation failed, refetching cart: {}", e);
                if let Err(refetch) = self.refresh(customer).await {
                    log::error!("Cart refetch failed: {}", refetch);
                }
                Err(e)
            }
            result => result,
        }
    }

    fn replace_cached(&self, line: &CartLine) {
        let mut lines = lock(&self.lines);
        match lines.iter_mut().find(|l| l.id == line.id) {
            Some(existing) => *existing = line.clone(),
            None => lines.push(line.clone()),
        }
    }
}
