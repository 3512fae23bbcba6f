extern crate fcs2_tasks;

fn main() { fcs2_tasks::entry_points::fcs2() }
