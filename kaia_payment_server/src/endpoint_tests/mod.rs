mod helpers;
mod merchants;
mod mocks;
mod orders;
mod webhooks;
