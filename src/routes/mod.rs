use axum::Router;

use crate::state::SharedState;

pub(crate) mod docs;
pub(crate) mod game;
pub(crate) mod health;
pub(crate) mod results;
pub(crate) mod sse;

/// Every route of the pool, bound to the shared state.
pub fn router(state: SharedState) -> Router<()> {
    health::router()
        .merge(sse::router())
        .merge(game::router())
        .merge(results::router())
        .merge(docs::router())
        .with_state(state)
}
