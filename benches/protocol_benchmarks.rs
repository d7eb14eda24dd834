use chrono::NaiveDate;
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use ntdsync::protocol::distribution::DistributionFrame;
use ntdsync::protocol::ntp::{MODE_SERVER, NtpPacket, NtpShort, NtpTimestamp};
use ntdsync::{CalendarZone, CorrectedTimestamp};

fn ntp_benchmark(c: &mut Criterion) {
    let packet = NtpPacket {
        version: 3,
        mode: MODE_SERVER,
        stratum: 2,
        poll: 6,
        precision: -20,
        root_delay: NtpShort::from_bits(0x0000_0123),
        root_dispersion: NtpShort::from_bits(0x0000_0456),
        reference_id: 0xC0A8_0001,
        reference: NtpTimestamp::new(3_913_055_990, 0x1234_5678),
        originate: NtpTimestamp::new(3_913_056_000, 0x0000_0001),
        receive: NtpTimestamp::new(3_913_056_000, 0x8000_0000),
        transmit: NtpTimestamp::new(3_913_056_000, 0x8000_1000),
    };
    let bytes = packet.encode().unwrap();

    c.bench_function("ntp_packet_encode", |b| {
        b.iter(|| black_box(&packet).encode().unwrap())
    });

    c.bench_function("ntp_packet_decode", |b| {
        b.iter(|| NtpPacket::decode(black_box(&bytes)).unwrap())
    });

    c.bench_function("ntp_timestamp_from_secs_f64", |b| {
        b.iter(|| NtpTimestamp::from_secs_f64(black_box(3_913_056_000.123_456)).unwrap())
    });
}

fn frame_benchmark(c: &mut Criterion) {
    let datetime = NaiveDate::from_ymd_opt(2024, 3, 15)
        .unwrap()
        .and_hms_opt(9, 5, 7)
        .unwrap();
    let corrected = CorrectedTimestamp::from_secs(1_710_493_507);

    c.bench_function("frame_from_datetime", |b| {
        b.iter(|| DistributionFrame::from_datetime(black_box(datetime)).unwrap())
    });

    c.bench_function("frame_from_timestamp_utc", |b| {
        b.iter(|| {
            DistributionFrame::from_timestamp(black_box(corrected), CalendarZone::Utc).unwrap()
        })
    });

    let frame = DistributionFrame::from_datetime(datetime).unwrap();
    c.bench_function("frame_decode", |b| {
        b.iter(|| DistributionFrame::decode(black_box(frame.as_bytes())).unwrap())
    });
}

criterion_group!(benches, ntp_benchmark, frame_benchmark);
criterion_main!(benches);
