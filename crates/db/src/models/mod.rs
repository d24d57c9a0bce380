pub mod lenient;
pub mod loading_plan;
pub mod order;
pub mod order_data;
