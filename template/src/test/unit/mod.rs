pub mod outer_product;
