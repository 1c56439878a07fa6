pub mod debounce;
pub mod dispatch_worker;
pub mod dispatcher;
pub mod frame_fusion;
pub mod geometry;
pub mod landmark;
pub mod single_hand;
pub mod two_hand;
