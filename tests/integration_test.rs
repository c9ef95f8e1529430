use std::sync::Arc;
use std::thread;

use schnitt::nodes::{
    AssumeSampleRate, BlankAudio, BlankOptions, MemorySource, Mix, RateSource, ShuffleChannels, SourceBinding,
    Splice, SplitChannels, TestAudio, TestOptions, Trim, TrimRange,
};
use schnitt::{
    AudioFormat, AudioInfo, AudioNode, BlockRef, Channel, ChannelLayout, Error, Inputs, Renderer, Requests, Result,
    SampleType, Stream,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn ramp(length: u64, block_size: usize) -> Stream {
    TestAudio::create(
        TestOptions::default()
            .with_layout(ChannelLayout::MONO)
            .with_length(length)
            .with_block_size(block_size),
    )
    .unwrap()
}

fn mono_i16(samples: Vec<i16>, block_size: usize) -> Stream {
    let format = AudioFormat::int16(ChannelLayout::MONO).unwrap();
    MemorySource::create(format, 44100, block_size, &[samples]).unwrap()
}

fn samples(stream: &Stream) -> Vec<i16> {
    Renderer::new().collect_channel::<i16>(stream, 0).unwrap()
}

fn expected_ramp(range: std::ops::RangeInclusive<u64>) -> Vec<i16> {
    range.map(TestAudio::sample_at).collect()
}

/// Checks that every block has the length its descriptor promises.
fn assert_block_lengths(stream: &Stream) {
    let info = *stream.info();
    let blocks = Renderer::new().render(stream).unwrap();
    assert_eq!(blocks.len(), info.num_blocks());
    for (n, block) in blocks.iter().enumerate() {
        let expected = if n + 1 < info.num_blocks() {
            info.block_size
        } else {
            (info.num_samples - n as u64 * info.block_size as u64) as usize
        };
        assert_eq!(block.len(), expected, "block {}", n);
    }
}

#[test]
fn trim_between_reports_exact_length() {
    init_tracing();
    let source = ramp(100, 40);
    let trimmed = Trim::create(&source, TrimRange::between(30, 69)).unwrap();
    assert_eq!(trimmed.info().num_samples, 40);
    assert_eq!(samples(&trimmed), expected_ramp(30..=69));
    assert_block_lengths(&trimmed);
}

#[test]
fn trim_aligned_and_misaligned_ranges() {
    let source = ramp(1000, 64);
    for &(first, last) in &[(0, 499), (64, 127), (128, 999), (1, 998), (63, 64), (500, 500), (999, 999)] {
        let trimmed = Trim::create(&source, TrimRange::between(first, last)).unwrap();
        assert_eq!(samples(&trimmed), expected_ramp(first..=last), "{}..={}", first, last);
        assert_block_lengths(&trimmed);
    }
    let by_length = Trim::create(&source, TrimRange::new().with_first(10).with_length(300)).unwrap();
    assert_eq!(samples(&by_length), expected_ramp(10..=309));
}

#[test]
fn aligned_trim_passes_blocks_through() {
    let source = ramp(1000, 64);
    let trimmed = Trim::create(&source, TrimRange::new().with_first(128)).unwrap();
    let renderer = Renderer::new();
    let upstream = renderer.block(&source, 3).unwrap();
    let output = renderer.block(&trimmed, 1).unwrap();
    assert!(Arc::ptr_eq(&upstream, &output));
}

#[test]
fn identity_trim_returns_source() {
    let source = ramp(100, 40);
    assert!(Trim::create(&source, TrimRange::new()).unwrap().ptr_eq(&source));
    assert!(Trim::create(&source, TrimRange::between(0, 99)).unwrap().ptr_eq(&source));
    assert!(Trim::create(&source, TrimRange::new().with_length(100)).unwrap().ptr_eq(&source));
}

#[test]
fn trim_rejects_out_of_range() {
    let source = ramp(100, 40);
    assert!(matches!(
        Trim::create(&source, TrimRange::new().with_first(100)),
        Err(Error::BeyondEnd { .. })
    ));
    assert!(matches!(
        Trim::create(&source, TrimRange::new().with_last(5).with_length(5)),
        Err(Error::BothLastAndLength { .. })
    ));
}

#[test]
fn splice_seams() {
    init_tracing();
    for &(a_len, b_len) in &[(128, 50), (100, 50), (1, 1), (63, 129), (65, 64)] {
        let a = ramp(a_len, 64);
        let b = mono_i16((0..b_len as i16).map(|v| -v - 1).collect(), 64);
        let spliced = Splice::create(&[a, b]).unwrap();
        assert_eq!(spliced.info().num_samples, a_len + b_len);

        let mut expected = expected_ramp(0..=a_len - 1);
        expected.extend((0..b_len as i16).map(|v| -v - 1));
        assert_eq!(samples(&spliced), expected, "{} + {}", a_len, b_len);
        assert_block_lengths(&spliced);
    }
}

#[test]
fn aligned_splice_copies_nothing() {
    let a = ramp(128, 64);
    let b = ramp(100, 64);
    let spliced = Splice::create(&[a.clone(), b.clone()]).unwrap();
    let renderer = Renderer::new();
    assert!(Arc::ptr_eq(&renderer.block(&a, 1).unwrap(), &renderer.block(&spliced, 1).unwrap()));
    assert!(Arc::ptr_eq(&renderer.block(&b, 1).unwrap(), &renderer.block(&spliced, 3).unwrap()));
}

#[test]
fn splice_is_associative() {
    let a = mono_i16((0..37).collect(), 16);
    let b = mono_i16((100..151).collect(), 16);
    let c = mono_i16((200..209).collect(), 16);
    let left = Splice::pair(&Splice::pair(&a, &b).unwrap(), &c).unwrap();
    let right = Splice::pair(&a, &Splice::pair(&b, &c).unwrap()).unwrap();
    let folded = Splice::create(&[a, b, c]).unwrap();
    assert_eq!(samples(&left), samples(&right));
    assert_eq!(samples(&left), samples(&folded));
    assert_eq!(samples(&folded).len(), 97);
}

#[test]
fn long_splice_chain_renders() {
    let parts: Vec<Stream> = (0..2500)
        .map(|_| {
            TestAudio::create(
                TestOptions::default()
                    .with_layout(ChannelLayout::MONO)
                    .with_length(3)
                    .with_block_size(8),
            )
            .unwrap()
        })
        .collect();
    let spliced = Splice::create(&parts).unwrap();
    let info = *spliced.info();
    assert_eq!(info.num_samples, 7500);

    let renderer = Renderer::new();
    let first = renderer.block(&spliced, 0).unwrap();
    assert_eq!(first.channel::<i16>(0).unwrap(), &[0, 1, 2, 0, 1, 2, 0, 1]);
    let last = renderer.block(&spliced, info.num_blocks() - 1).unwrap();
    assert_eq!(last.channel::<i16>(0).unwrap(), &[2, 0, 1, 2]);

    #[cfg(feature = "parallel")]
    {
        let parallel = Renderer::new().with_parallel_inputs(true);
        assert_eq!(parallel.block(&spliced, 0).unwrap(), first);
    }
}

#[test]
fn trim_inverts_splice() {
    let a = ramp(77, 32);
    let b = mono_i16(vec![7; 45], 32);
    let spliced = Splice::pair(&a, &b).unwrap();
    let back = Trim::create(&spliced, TrimRange::new().with_length(77)).unwrap();
    assert_eq!(samples(&back), samples(&a));
    let tail = Trim::create(&spliced, TrimRange::new().with_first(77)).unwrap();
    assert_eq!(samples(&tail), vec![7; 45]);
}

#[test]
fn identity_mix_is_exact() {
    let stereo_i16 = TestAudio::create(TestOptions::default().with_length(500).with_block_size(128)).unwrap();
    let mixed = Mix::from_streams(&[stereo_i16.clone()], &[1.0, 0.0, 0.0, 1.0], ChannelLayout::STEREO).unwrap();
    let renderer = Renderer::new();
    for ch in 0..2 {
        assert_eq!(
            renderer.collect_channel::<i16>(&mixed, ch).unwrap(),
            renderer.collect_channel::<i16>(&stereo_i16, ch).unwrap()
        );
    }

    let format = AudioFormat::float32(ChannelLayout::MONO).unwrap();
    let values: Vec<f32> = (0..300).map(|i| i as f32 * 0.001 - 0.15).collect();
    let float = MemorySource::create(format, 48000, 100, &[values.clone()]).unwrap();
    let mixed = Mix::from_streams(&[float], &[1.0], ChannelLayout::MONO).unwrap();
    assert_eq!(renderer.collect_channel::<f32>(&mixed, 0).unwrap(), values);
}

#[test]
fn mix_averages_and_truncates() {
    let a = mono_i16(vec![1000; 10], 4);
    let b = mono_i16(vec![2000; 10], 4);
    let mixed = Mix::from_streams(&[a.clone(), b], &[0.5, 0.5], ChannelLayout::MONO).unwrap();
    assert_eq!(samples(&mixed), vec![1500; 10]);

    let third = Mix::from_streams(&[a], &[1.0 / 3.0], ChannelLayout::MONO).unwrap();
    assert_eq!(samples(&third), vec![333; 10]);
}

#[test]
fn mix_matrix_routes_per_output_channel() {
    let format = AudioFormat::int16(ChannelLayout::STEREO).unwrap();
    let source = MemorySource::create(format, 44100, 8, &[vec![100i16; 5], vec![10; 5]]).unwrap();
    // out0 = 2*L + 0*R, out1 = 1*L + 3*R
    let mixed = Mix::from_streams(&[source], &[2.0, 0.0, 1.0, 3.0], ChannelLayout::STEREO).unwrap();
    let renderer = Renderer::new();
    assert_eq!(renderer.collect_channel::<i16>(&mixed, 0).unwrap(), vec![200; 5]);
    assert_eq!(renderer.collect_channel::<i16>(&mixed, 1).unwrap(), vec![130; 5]);
}

#[test]
fn mix_clamps_wide_integers_upward_only() {
    let format = AudioFormat::new(SampleType::Integer, 24, ChannelLayout::MONO).unwrap();
    let max = (1 << 23) - 1;
    let source = MemorySource::create(format, 44100, 4, &[vec![max, max - 1, 5, -max]]).unwrap();
    let doubled = Mix::from_streams(&[source], &[2.0], ChannelLayout::MONO).unwrap();
    let out = Renderer::new().collect_channel::<i32>(&doubled, 0).unwrap();
    assert_eq!(out, vec![max, max, 10, -2 * max]);
}

#[test]
fn mix_clamps_32_bit_sums_at_the_boundary() {
    let format = AudioFormat::int32(ChannelLayout::STEREO).unwrap();
    let left = vec![i32::MAX, i32::MAX - 1, i32::MAX, i32::MIN];
    let right = vec![0, 1, 1, -1];
    let source = MemorySource::create(format, 48000, 4, &[left, right]).unwrap();
    let summed = Mix::from_streams(&[source], &[1.0, 1.0], ChannelLayout::MONO).unwrap();
    let out = Renderer::new().collect_channel::<i32>(&summed, 0).unwrap();
    assert_eq!(out, vec![i32::MAX, i32::MAX, i32::MAX, i32::MIN]);
}

#[test]
fn mix_selects_channels_from_several_streams() {
    let format = AudioFormat::int16(ChannelLayout::STEREO).unwrap();
    let a = MemorySource::create(format, 44100, 4, &[vec![1i16; 6], vec![2; 6]]).unwrap();
    let b = MemorySource::create(format, 44100, 4, &[vec![10i16; 6], vec![20; 6]]).unwrap();
    let mixed = Mix::select(
        &[a, b],
        &[Channel::FRONT_RIGHT, Channel::FRONT_LEFT, Channel::FRONT_RIGHT],
        &[1.0, 1.0, 1.0],
        ChannelLayout::MONO,
    )
    .unwrap();
    assert_eq!(samples(&mixed), vec![32; 6]);
}

#[test]
fn shuffle_zero_fills_short_sources() {
    init_tracing();
    let long = ramp(100, 32);
    let short = mono_i16(vec![-1; 40], 32);
    let shuffled = ShuffleChannels::create(
        &[long, short],
        &[Channel::FRONT_LEFT, Channel::FRONT_LEFT],
        ChannelLayout::STEREO,
    )
    .unwrap();
    assert_eq!(shuffled.info().num_samples, 100);
    assert_block_lengths(&shuffled);

    let renderer = Renderer::new();
    assert_eq!(renderer.collect_channel::<i16>(&shuffled, 0).unwrap(), expected_ramp(0..=99));
    let right = renderer.collect_channel::<i16>(&shuffled, 1).unwrap();
    assert!(right[..40].iter().all(|&s| s == -1));
    assert!(right[40..].iter().all(|&s| s == 0));
}

#[test]
fn shuffle_swaps_and_duplicates() {
    let format = AudioFormat::int16(ChannelLayout::STEREO).unwrap();
    let source = MemorySource::create(format, 44100, 4, &[vec![1i16; 6], vec![2; 6]]).unwrap();
    let layout = ChannelLayout::from_channels([Channel::FRONT_LEFT, Channel::FRONT_RIGHT, Channel::FRONT_CENTER]);
    let bindings = [
        SourceBinding::new(&source, Channel::FRONT_RIGHT),
        SourceBinding::new(&source, Channel::FRONT_LEFT),
        SourceBinding::new(&source, Channel::FRONT_RIGHT),
    ];
    let shuffled = ShuffleChannels::from_bindings(&bindings, layout).unwrap();
    let renderer = Renderer::new();
    assert_eq!(renderer.collect_channel::<i16>(&shuffled, 0).unwrap(), vec![2; 6]);
    assert_eq!(renderer.collect_channel::<i16>(&shuffled, 1).unwrap(), vec![1; 6]);
    assert_eq!(renderer.collect_channel::<i16>(&shuffled, 2).unwrap(), vec![2; 6]);
}

#[test]
fn split_then_recombine() {
    let format = AudioFormat::int16(ChannelLayout::STEREO).unwrap();
    let left: Vec<i16> = (0..50).collect();
    let right: Vec<i16> = (0..50).map(|v| v * -2).collect();
    let source = MemorySource::create(format, 44100, 16, &[left.clone(), right.clone()]).unwrap();

    let parts = SplitChannels::create(&source).unwrap();
    assert_eq!(parts.len(), 2);
    assert_eq!(samples(&parts[0]), left);
    assert_eq!(samples(&parts[1]), right);

    let rejoined = ShuffleChannels::create(
        &[parts[0].clone(), parts[1].clone()],
        &[Channel::FRONT_LEFT, Channel::FRONT_RIGHT],
        ChannelLayout::STEREO,
    )
    .unwrap();
    let renderer = Renderer::new();
    assert_eq!(renderer.collect_channel::<i16>(&rejoined, 0).unwrap(), left);
    assert_eq!(renderer.collect_channel::<i16>(&rejoined, 1).unwrap(), right);
}

#[test]
fn relabeled_rate_keeps_samples() {
    let source = ramp(200, 64);
    let relabeled = AssumeSampleRate::create(&source, RateSource::Explicit(8000)).unwrap();
    assert_eq!(relabeled.info().sample_rate, 8000);
    assert_eq!(samples(&relabeled), samples(&source));

    let other = ramp(10, 64);
    let mismatched = AssumeSampleRate::create(&other, RateSource::Explicit(8000)).unwrap();
    assert!(Splice::pair(&relabeled, &mismatched).is_ok());
    assert!(matches!(Splice::pair(&source, &mismatched), Err(Error::FormatMismatch { .. })));
}

#[test]
fn generators_are_deterministic() {
    let a = TestAudio::create(TestOptions::default().with_length(70_000)).unwrap();
    let b = TestAudio::create(TestOptions::default().with_length(70_000)).unwrap();
    let renderer = Renderer::new();
    let xs = renderer.collect_channel::<i16>(&a, 1).unwrap();
    assert_eq!(xs, renderer.collect_channel::<i16>(&b, 1).unwrap());
    assert_eq!(xs[65_536], 0);
    assert_eq!(xs[65_535] as u16, 65_535);

    let blank = BlankAudio::create(BlankOptions::default().with_length(5000)).unwrap();
    let silence = renderer.collect_channel::<i16>(&blank, 0).unwrap();
    assert_eq!(silence.len(), 5000);
    assert!(silence.iter().all(|&s| s == 0));
}

#[test]
fn retained_silence_is_shared_across_threads() {
    let blank = BlankAudio::create(
        BlankOptions::default()
            .with_length(100 * 64)
            .with_block_size(64)
            .with_keep(true)
            .with_format(SampleType::Float, 32),
    )
    .unwrap();
    // no cache, so every call reaches the node
    let renderer = Renderer::new().with_cache_capacity(0);

    let blocks: Vec<BlockRef> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let blank = &blank;
                let renderer = &renderer;
                scope.spawn(move || renderer.block(blank, t * 7).unwrap())
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    assert!(blocks.iter().all(|b| Arc::ptr_eq(b, &blocks[0])));
    assert!(blocks[0].channel::<f32>(1).unwrap().iter().all(|&s| s == 0.0));
}

struct Failing {
    info: AudioInfo,
    bad_block: usize,
}

impl AudioNode for Failing {
    fn name(&self) -> &'static str {
        "Failing"
    }

    fn info(&self) -> &AudioInfo {
        &self.info
    }

    fn request(&self, _n: usize, _requests: &mut Requests) {}

    fn assemble(&self, n: usize, _inputs: &Inputs) -> Result<BlockRef> {
        if n == self.bad_block {
            return Err(Error::Produce(format!("read error at block {}", n)));
        }
        Ok(schnitt::Block::zeroed(self.info.format, self.info.block_len(n)).into_ref())
    }
}

#[test]
fn upstream_failures_propagate_unchanged() {
    init_tracing();
    let format = AudioFormat::int16(ChannelLayout::MONO).unwrap();
    let info = AudioInfo::new(format, 44100, 100, 16).unwrap();
    let failing = Stream::new(Failing { info, bad_block: 2 });
    let expected = Error::Produce("read error at block 2".into());

    let trimmed = Trim::create(&failing, TrimRange::new().with_first(5)).unwrap();
    let mixed = Mix::from_streams(&[trimmed.clone()], &[1.0], ChannelLayout::MONO).unwrap();
    let renderer = Renderer::new();
    assert!(renderer.block(&mixed, 0).is_ok());
    // output block 1 straddles upstream blocks 1 and 2
    assert_eq!(renderer.block(&mixed, 1).err(), Some(expected.clone()));
    assert_eq!(renderer.render(&mixed).err(), Some(expected));
}

#[test]
fn zero_block_size_is_an_error_not_a_panic() {
    let format = AudioFormat::int16(ChannelLayout::MONO).unwrap();
    let info = AudioInfo {
        format,
        sample_rate: 44100,
        num_samples: 100,
        block_size: 0,
    };
    let broken = Stream::new(Failing { info, bad_block: usize::MAX });
    assert_eq!(Renderer::new().block(&broken, 0).err(), Some(Error::InvalidBlockSize(0)));
    assert_eq!(Splice::pair(&broken, &broken).err(), Some(Error::InvalidBlockSize(0)));
    assert_eq!(
        Trim::create(&broken, TrimRange::new().with_first(1)).err(),
        Some(Error::InvalidBlockSize(0))
    );
}

#[test]
fn collecting_a_huge_stream_does_not_reserve_it_up_front() {
    let format = AudioFormat::int16(ChannelLayout::MONO).unwrap();
    let info = AudioInfo::new(format, 44100, u64::MAX / 2, 1 << 20).unwrap();
    let failing = Stream::new(Failing { info, bad_block: 0 });
    assert_eq!(
        Renderer::new().collect_channel::<i16>(&failing, 0).err(),
        Some(Error::Produce("read error at block 0".into()))
    );
}

#[test]
fn out_of_range_block_is_an_error() {
    let source = ramp(100, 40);
    assert_eq!(
        Renderer::new().block(&source, 3).err(),
        Some(Error::BlockOutOfRange { index: 3, count: 3 })
    );
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_render_matches_serial() {
    let a = ramp(10_000, 256);
    let b = mono_i16((0..5_003).map(|v| (v % 300) as i16).collect(), 256);
    let spliced = Splice::create(&[a.clone(), b, a]).unwrap();
    let trimmed = Trim::create(&spliced, TrimRange::between(1_234, 20_000)).unwrap();
    let split = SplitChannels::create(&trimmed).unwrap();
    let mixed = Mix::from_streams(&[split[0].clone(), trimmed], &[0.5, 0.5], ChannelLayout::MONO).unwrap();

    let serial = Renderer::new().render(&mixed).unwrap();
    let parallel = Renderer::new().with_parallel_inputs(true).render_parallel(&mixed).unwrap();
    assert_eq!(serial.len(), parallel.len());
    for (s, p) in serial.iter().zip(&parallel) {
        assert_eq!(s.as_ref(), p.as_ref());
    }
}
