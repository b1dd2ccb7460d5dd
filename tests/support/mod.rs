#![allow(dead_code)]

pub mod startups;
