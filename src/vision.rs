// Per-frame image transforms: mirror, grayscale, threshold.
// Visual expectation: the camera image reads like a mirror, and the threshold
// output is a black/white silhouette where black marks an obstacle.
//
// Every stage reads `src` and writes a distinct `dst` of identical dimensions.
use crate::error::Error;
use crate::types::PixelBuffer;

pub const WHITE: [u8; 4] = [255, 255, 255, 255];
pub const BLACK: [u8; 4] = [0, 0, 0, 0];

fn check_size(stage: &'static str, src: &PixelBuffer, dst: &PixelBuffer) -> Result<(), Error> {
    if !src.same_size(dst) {
        return Err(Error::SizeMismatch {
            stage,
            src_w: src.width(),
            src_h: src.height(),
            dst_w: dst.width(),
            dst_h: dst.height(),
        });
    }
    Ok(())
}

/// Sum of all four stored bytes, alpha included.
#[inline]
fn channel_sum(px: &[u8]) -> u32 {
    px[0] as u32 + px[1] as u32 + px[2] as u32 + px[3] as u32
}

/// Four-channel mean as a byte, ties rounded to even (how a clamped byte array stores it).
#[inline]
fn mean_u8(sum: u32) -> u8 {
    let (q, rem) = (sum / 4, sum % 4);
    let up = rem == 3 || (rem == 2 && q % 2 == 1);
    (q + up as u32) as u8
}

/// Horizontal flip: column `c` of `dst` comes from column `W-1-c` of `src`.
pub fn mirror(src: &PixelBuffer, dst: &mut PixelBuffer) -> Result<(), Error> {
    check_size("mirror", src, dst)?;
    let stride = src.width() * 4;
    if stride == 0 {
        return Ok(());
    }
    let out = dst.data_mut();
    for (src_row, dst_row) in src.data().chunks_exact(stride).zip(out.chunks_exact_mut(stride)) {
        for (s, d) in src_row.chunks_exact(4).zip(dst_row.chunks_exact_mut(4).rev()) {
            d.copy_from_slice(s);
        }
    }
    Ok(())
}

/// Intensity = mean of (r, g, b, a), ties to even, written to all four channels.
pub fn grayscale(src: &PixelBuffer, dst: &mut PixelBuffer) -> Result<(), Error> {
    check_size("grayscale", src, dst)?;
    for (s, d) in src.data().chunks_exact(4).zip(dst.data_mut().chunks_exact_mut(4)) {
        let v = mean_u8(channel_sum(s));
        d.copy_from_slice(&[v, v, v, v]);
    }
    Ok(())
}

/// White where the four-channel mean is at least `t * 255`, transparent black elsewhere.
/// `t` is clamped to `[0, 1]`.
pub fn threshold(src: &PixelBuffer, dst: &mut PixelBuffer, t: f32) -> Result<(), Error> {
    check_size("threshold", src, dst)?;
    let cutoff = t.clamp(0.0, 1.0) * 255.0;
    for (s, d) in src.data().chunks_exact(4).zip(dst.data_mut().chunks_exact_mut(4)) {
        let mean = channel_sum(s) as f32 / 4.0;
        d.copy_from_slice(if mean >= cutoff { &WHITE } else { &BLACK });
    }
    Ok(())
}

/// Which buffer ends up on screen: the silhouette when debugging, the mirrored feed otherwise.
pub fn select_presented<'a>(
    debug: bool,
    display: &'a PixelBuffer,
    obstacle: &'a PixelBuffer,
) -> &'a PixelBuffer {
    if debug { obstacle } else { display }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(w: usize, h: usize) -> PixelBuffer {
        let mut b = PixelBuffer::blank(w, h);
        for row in 0..h {
            for col in 0..w {
                let v = (row * w + col) as u8;
                b.set_pixel(col, row, [v, v.wrapping_mul(3), v.wrapping_add(40), 200]);
            }
        }
        b
    }

    #[test]
    fn mirror_flips_columns() {
        let src = gradient(3, 2);
        let mut dst = PixelBuffer::blank(3, 2);
        mirror(&src, &mut dst).unwrap();
        for row in 0..2 {
            for col in 0..3 {
                assert_eq!(dst.pixel(col, row), src.pixel(2 - col, row));
            }
        }
    }

    #[test]
    fn mirror_twice_is_identity() {
        let src = gradient(5, 4);
        let mut once = PixelBuffer::blank(5, 4);
        let mut twice = PixelBuffer::blank(5, 4);
        mirror(&src, &mut once).unwrap();
        mirror(&once, &mut twice).unwrap();
        assert_eq!(twice, src);
    }

    #[test]
    fn grayscale_averages_all_four_channels() {
        let src = PixelBuffer::from_rgba(1, 1, vec![100, 50, 10, 0]).unwrap();
        let mut dst = PixelBuffer::blank(1, 1);
        grayscale(&src, &mut dst).unwrap();
        // (100 + 50 + 10 + 0) / 4 = 40
        assert_eq!(dst.pixel(0, 0), Some([40, 40, 40, 40]));
    }

    #[test]
    fn grayscale_rounds_ties_to_even() {
        // sums 2, 6, 610: means 0.5, 1.5, 152.5
        let src = PixelBuffer::from_rgba(
            3,
            1,
            vec![1, 1, 0, 0, 3, 3, 0, 0, 153, 152, 150, 155],
        )
        .unwrap();
        let mut dst = PixelBuffer::blank(3, 1);
        grayscale(&src, &mut dst).unwrap();
        assert_eq!(dst.red(0, 0), Some(0));
        assert_eq!(dst.red(1, 0), Some(2));
        assert_eq!(dst.red(2, 0), Some(152));
        assert_eq!(mean_u8(7), 2);
        assert_eq!(mean_u8(5), 1);
    }

    #[test]
    fn tie_below_cutoff_stays_an_obstacle() {
        // mean 152.5 stores as 152, under the default 0.6 cutoff of 153
        let src = PixelBuffer::from_rgba(1, 1, vec![153, 152, 150, 155]).unwrap();
        let mut gray = PixelBuffer::blank(1, 1);
        let mut mask = PixelBuffer::blank(1, 1);
        grayscale(&src, &mut gray).unwrap();
        threshold(&gray, &mut mask, 0.6).unwrap();
        assert_eq!(mask.pixel(0, 0), Some(BLACK));
    }

    #[test]
    fn grayscale_is_idempotent() {
        let src = gradient(6, 3);
        let mut once = PixelBuffer::blank(6, 3);
        let mut twice = PixelBuffer::blank(6, 3);
        grayscale(&src, &mut once).unwrap();
        grayscale(&once, &mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn grayscale_covers_the_last_pixel() {
        let src = PixelBuffer::from_rgba(2, 1, vec![0, 0, 0, 0, 255, 255, 255, 255]).unwrap();
        let mut dst = PixelBuffer::blank(2, 1);
        grayscale(&src, &mut dst).unwrap();
        assert_eq!(dst.pixel(1, 0), Some(WHITE));
    }

    #[test]
    fn threshold_is_binary_and_matches_mean() {
        let src = gradient(8, 8);
        let mut dst = PixelBuffer::blank(8, 8);
        let t = 0.45;
        threshold(&src, &mut dst, t).unwrap();
        for (s, d) in src.data().chunks_exact(4).zip(dst.data().chunks_exact(4)) {
            let mean = channel_sum(s) as f32 / 4.0;
            let expected = if mean >= t * 255.0 { WHITE } else { BLACK };
            assert_eq!(d, &expected[..]);
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        // mean 63.75 == 0.25 * 255 exactly
        let src = PixelBuffer::from_rgba(2, 1, vec![255, 0, 0, 0, 254, 0, 0, 0]).unwrap();
        let mut dst = PixelBuffer::blank(2, 1);
        threshold(&src, &mut dst, 0.25).unwrap();
        assert_eq!(dst.pixel(0, 0), Some(WHITE));
        assert_eq!(dst.pixel(1, 0), Some(BLACK));
    }

    #[test]
    fn stages_reject_mismatched_buffers() {
        let src = PixelBuffer::blank(4, 2);
        let mut dst = PixelBuffer::blank(2, 4);
        assert!(matches!(
            mirror(&src, &mut dst),
            Err(Error::SizeMismatch { stage: "mirror", .. })
        ));
        assert!(grayscale(&src, &mut dst).is_err());
        assert!(threshold(&src, &mut dst, 0.5).is_err());
    }

    #[test]
    fn presented_buffer_follows_debug_flag() {
        let display = PixelBuffer::blank(1, 1);
        let obstacle = PixelBuffer::from_rgba(1, 1, WHITE.to_vec()).unwrap();
        assert!(std::ptr::eq(select_presented(false, &display, &obstacle), &display));
        assert!(std::ptr::eq(select_presented(true, &display, &obstacle), &obstacle));
    }
}
