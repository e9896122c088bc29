pub mod model;
pub mod paginate;
pub mod util;
