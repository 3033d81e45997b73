/// A run of image numbers handled by a single dozor invocation.
///
/// Outside of overlap mode the numbers are contiguous and ascending; in overlap mode a
/// batch holds exactly one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    images: Vec<u32>,
}

impl Batch {
    fn new(images: Vec<u32>) -> Self {
        Self { images }
    }

    pub fn first(&self) -> u32 {
        self.images[0]
    }

    pub fn last(&self) -> u32 {
        self.images[self.images.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[u32] {
        &self.images
    }

    /// Name of the batch working directory, `<first>_<last>` zero padded to four digits
    pub fn directory_name(&self) -> String {
        format!("{:04}_{:04}", self.first(), self.last())
    }
}

/// Split a set of image numbers into batches.
///
/// Images are walked in ascending order; a new batch is started whenever an image does not
/// follow the previous one or the current batch already holds `batch_size` images. In
/// overlap mode every batch is broken up again into single image batches. A `batch_size`
/// of zero is treated as one.
pub fn partition<I>(image_numbers: I, batch_size: usize, overlap: bool) -> Vec<Batch>
where
    I: IntoIterator<Item = u32>,
{
    let batch_size = batch_size.max(1);
    let mut sorted: Vec<u32> = image_numbers.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut batches: Vec<Batch> = Vec::new();
    let mut current: Vec<u32> = Vec::new();
    let mut next_expected: Option<u32> = None;
    for number in sorted {
        match next_expected {
            Some(expected) if number == expected && current.len() < batch_size => {
                current.push(number);
            }
            Some(_) => {
                batches.push(Batch::new(std::mem::take(&mut current)));
                current.push(number);
            }
            None => current.push(number),
        }
        next_expected = number.checked_add(1);
    }
    if !current.is_empty() {
        batches.push(Batch::new(current));
    }

    if overlap {
        batches = batches
            .into_iter()
            .flat_map(|batch| batch.images.into_iter().map(|n| Batch::new(vec![n])))
            .collect();
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_vecs(batches: &[Batch]) -> Vec<Vec<u32>> {
        batches.iter().map(|b| b.images().to_vec()).collect()
    }

    #[test]
    fn test_contiguous_runs() {
        let batches = partition([5, 1, 2, 3, 7, 8], 10, false);
        assert_eq!(as_vecs(&batches), vec![vec![1, 2, 3], vec![5], vec![7, 8]]);
    }

    #[test]
    fn test_size_cap() {
        let batches = partition(1..=7, 3, false);
        assert_eq!(
            as_vecs(&batches),
            vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]]
        );
    }

    #[test]
    fn test_batch_size_one() {
        let batches = partition([3, 1, 2], 1, false);
        assert_eq!(as_vecs(&batches), vec![vec![1], vec![2], vec![3]]);
    }

    #[test]
    fn test_overlap_singletons() {
        let batches = partition([1, 2, 3, 10], 5000, true);
        assert_eq!(as_vecs(&batches), vec![vec![1], vec![2], vec![3], vec![10]]);
    }

    #[test]
    fn test_empty_input() {
        assert!(partition(Vec::<u32>::new(), 4, false).is_empty());
    }

    #[test]
    fn test_directory_name() {
        let batches = partition(1..=20, 10, false);
        assert_eq!(batches[1].directory_name(), "0011_0020");
    }
}
