pub mod booking_reader;
pub mod payment_writer;
pub mod transfer_reader;
