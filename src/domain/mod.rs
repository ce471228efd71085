pub mod artist;
pub mod id;
pub mod locator;
pub mod track;
