// Data layer: possession events, passing options and playing time.

pub mod minutes;
pub mod possessions;
