pub mod forecast;
pub mod product;
pub mod recommendation;
pub mod sales;
