//! Built-in function groups, named exactly as spec.md §2 point 6 groups
//! them: existence, filtering/projection, navigation, combining,
//! conversion, string, numeric, utility. Date/time arithmetic is the `+`/`-`
//! operators (`FhirPathValue::calc`), not a registry function, so there is
//! no separate date/time group; `now`/`today`/`timeOfDay` live in `utility`
//! alongside `iif`/`trace`.

mod combining;
mod conversion;
mod existence;
mod filtering;
mod navigation;
mod numeric;
mod string;
mod utility;

use crate::registry::FunctionRegistry;

pub fn register_all(registry: &mut FunctionRegistry) {
    existence::register(registry);
    filtering::register(registry);
    navigation::register(registry);
    combining::register(registry);
    conversion::register(registry);
    string::register(registry);
    numeric::register(registry);
    utility::register(registry);
}
