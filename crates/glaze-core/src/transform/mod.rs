//! Transform definitions: curve model, adjustment params, LUT baking.

pub mod bake;
pub mod curve_model;
pub mod lut;
pub mod params;
