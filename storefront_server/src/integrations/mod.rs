pub mod hooks;
pub mod razorpay;
