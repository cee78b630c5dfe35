mod lifecycle;
mod transport;
