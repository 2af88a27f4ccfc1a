pub mod cmd_loxone;
pub mod cmd_set;
pub mod cmd_show;
pub mod cmd_tree;
pub mod common;
