//! Request dispatch: parameter binding and handler invocation.
//!
//! The [`Dispatcher`] is the terminal stage of every route pipeline. It binds
//! the action's declared parameters from the request context, in declared
//! position order, and invokes the handler against the shared controller
//! instance.

pub mod binder;
pub mod dispatcher;

pub use binder::bind;
pub use dispatcher::Dispatcher;
