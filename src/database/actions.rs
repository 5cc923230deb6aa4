mod ingredients;
mod recipes;
mod relations;
mod shopping_list;
mod tags;
mod users;

pub use ingredients::*;
pub use recipes::*;
pub use relations::*;
pub use shopping_list::*;
pub use tags::*;
pub use users::*;
