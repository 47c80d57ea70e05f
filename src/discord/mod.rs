pub(crate) mod bot;
pub(crate) mod commands;
pub(crate) mod errors;
pub(crate) mod gateway;
pub(crate) mod interactions;
pub(crate) mod intro;
pub(crate) mod membership;
pub(crate) mod notice;
pub(crate) mod roles;
pub(crate) mod state;
pub(crate) mod view;
pub(crate) mod voice;
