#[cfg(test)]
pub mod impl_fake;
pub mod impl_http;
pub mod interface;
pub mod source;
