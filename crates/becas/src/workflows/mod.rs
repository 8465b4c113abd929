pub mod scholarships;
