// Admin CRUD surface: prompts, agent-prompt attachment,
// quota limits, agents, tools, and the two policy kinds. Every module
// shares the same `AppState` the proxy routes use.

pub mod agent_prompts;
pub mod agents;
pub mod limits;
pub mod prompts;
pub mod tool_invocation_policies;
pub mod tools;
pub mod trusted_data_policies;

use axum::Router;

use crate::state::AppState;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .merge(agents::routes(state.clone()))
        .merge(prompts::routes(state.clone()))
        .merge(agent_prompts::routes(state.clone()))
        .merge(limits::routes(state.clone()))
        .merge(tools::routes(state.clone()))
        .merge(trusted_data_policies::routes(state.clone()))
        .merge(tool_invocation_policies::routes(state))
}
