use std::cmp::Ordering;

/// u32-key radix sort for SoA (inds/vals).
/// - Sorts by inds ascending
/// - Reorders vals accordingly
/// - Stable: equal keys keep their relative order
///
/// Complexity: 4 passes, each O(n + 256)
pub fn radix_sort_u32_soa<N: Copy + Default>(inds: &mut [u32], vals: &mut [N]) {
    assert_eq!(inds.len(), vals.len());
    let n = inds.len();
    if n <= 1 {
        return;
    }

    // Small sizes: insertion sort is faster than allocating scratch.
    if n <= 32 {
        insertion_sort_u32_soa(inds, vals);
        return;
    }

    let mut inds_tmp = vec![0u32; n];
    let mut vals_tmp = vec![N::default(); n];

    // 4 passes: byte 0..3 (LSD), ping-pong between the input and scratch buffers
    for (pass, shift) in [0u32, 8, 16, 24].into_iter().enumerate() {
        let (src_i, src_v, dst_i, dst_v): (&[u32], &[N], &mut [u32], &mut [N]) = if pass % 2 == 0 {
            (&*inds, &*vals, inds_tmp.as_mut_slice(), vals_tmp.as_mut_slice())
        } else {
            (inds_tmp.as_slice(), vals_tmp.as_slice(), &mut *inds, &mut *vals)
        };

        let mut count = [0usize; 256];
        for &k in src_i {
            count[((k >> shift) & 0xFF) as usize] += 1;
        }

        // prefix sum -> starting positions
        let mut sum = 0usize;
        for c in count.iter_mut() {
            let tmp = *c;
            *c = sum;
            sum += tmp;
        }

        for (&k, &v) in src_i.iter().zip(src_v) {
            let b = ((k >> shift) & 0xFF) as usize;
            let pos = count[b];
            count[b] = pos + 1;
            dst_i[pos] = k;
            dst_v[pos] = v;
        }
    }
    // even pass count: the result is back in `inds` / `vals`
}

/// Tiny insertion sort for small n (SoA).
#[inline(always)]
fn insertion_sort_u32_soa<N: Copy>(inds: &mut [u32], vals: &mut [N]) {
    let n = inds.len();
    for i in 1..n {
        let mut j = i;
        while j > 0 && inds[j] < inds[j - 1] {
            inds.swap(j, j - 1);
            vals.swap(j, j - 1);
            j -= 1;
        }
    }
}

/// Indices that order `values` descending.
/// Equal values keep index order; NaN sorts after every number.
pub fn argsort_desc_stable(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| cmp_nan_last(values[b], values[a], true));
    idx
}

/// Indices that order `values` ascending.
/// Equal values keep index order; NaN sorts after every number.
pub fn argsort_asc_stable(values: &[f64]) -> Vec<usize> {
    let mut idx: Vec<usize> = (0..values.len()).collect();
    idx.sort_by(|&a, &b| cmp_nan_last(values[a], values[b], false));
    idx
}

#[inline]
fn cmp_nan_last(x: f64, y: f64, swapped: bool) -> Ordering {
    match (x.is_nan(), y.is_nan()) {
        // -0.0 == 0.0 として扱う
        (false, false) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        // x/y は降順だと入れ替わっているので NaN の向きも反転
        (true, false) => if swapped { Ordering::Less } else { Ordering::Greater },
        (false, true) => if swapped { Ordering::Greater } else { Ordering::Less },
    }
}
