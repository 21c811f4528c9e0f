pub mod array;
pub mod plant;
pub mod production;
pub mod site;
pub mod weather;
