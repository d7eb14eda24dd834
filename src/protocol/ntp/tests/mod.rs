mod packet_proptest;
mod timestamp;
