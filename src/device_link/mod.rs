pub mod gateway;
#[cfg(test)]
pub mod impl_fake;
pub mod impl_tty;
pub mod interface;

#[cfg(test)]
mod tests;
